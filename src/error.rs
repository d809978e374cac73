use crate::model::CellId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("shape `{0}` is already registered")]
    Duplicate(String),
    #[error("shape `{name}` inherits from unknown shape `{parent}`")]
    UnknownAncestor { name: String, parent: String },
    #[error("registering `{name}` would make its inheritance chain cyclic")]
    Cycle { name: String },
    #[error("unknown shape `{0}`")]
    UnknownShape(String),
    #[error("port `{port}` of shape `{shape}` uses undefined port group `{group}`")]
    UnknownPortGroup {
        shape: String,
        port: String,
        group: String,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    #[error("edge endpoint does not land on a port")]
    BlankEndpoint,
    #[error("edge endpoint references missing node {0}")]
    UnknownNode(CellId),
    #[error("node {node} has no port `{port}`")]
    UnknownPort { node: CellId, port: String },
    #[error("self loops are disabled (node {0})")]
    SelfLoop(CellId),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    #[error("document is not valid JSON: {0}")]
    Syntax(String),
    #[error("failed to encode document: {0}")]
    Encode(String),
    #[error("unsupported document version {0}")]
    UnsupportedVersion(u32),
    #[error("cell id {0} appears more than once")]
    DuplicateId(CellId),
    #[error("edge {edge} references missing node {node}")]
    MissingNode { edge: CellId, node: CellId },
    #[error("edge {edge} references missing port `{port}` on node {node}")]
    MissingPort {
        edge: CellId,
        node: CellId,
        port: String,
    },
    #[error("cell {0} has invalid geometry")]
    InvalidGeometry(CellId),
    #[error("cell id {0} is out of range")]
    IdOutOfRange(CellId),
    #[error("node {node} declares port `{port}` more than once")]
    DuplicatePort { node: CellId, port: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("no cell with id {0}")]
    UnknownCell(CellId),
    #[error("cell {0} is not a node")]
    NotANode(CellId),
    #[error("invalid geometry for cell {0}")]
    InvalidGeometry(CellId),
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings toml: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("settings toml: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("settings json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EditResult<T> = std::result::Result<T, EditError>;
