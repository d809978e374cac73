//! The serialized snapshot of a diagram.
//!
//! A document is parsed and checked as a whole before anything uses it, so
//! a broken file never leaves a half-loaded graph behind.

use crate::error::{FormatError, LoadError};
use crate::graph::Graph;
use crate::model::{Cell, Endpoint, MAX_CELL_ID, Point};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: u32,
    pub cells: Vec<Cell>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: VERSION,
            cells: Vec::new(),
        }
    }
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let doc: Document =
            serde_json::from_str(text).map_err(|e| FormatError::Syntax(e.to_string()))?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if self.version != VERSION {
            return Err(FormatError::UnsupportedVersion(self.version));
        }
        let mut seen = HashSet::new();
        let mut nodes = HashMap::new();
        for cell in &self.cells {
            if cell.id().0 > MAX_CELL_ID {
                return Err(FormatError::IdOutOfRange(cell.id()));
            }
            if !seen.insert(cell.id()) {
                return Err(FormatError::DuplicateId(cell.id()));
            }
            if let Cell::Node(node) = cell {
                if !node.size.is_valid() || !node.position.is_finite() {
                    return Err(FormatError::InvalidGeometry(node.id));
                }
                let mut ports = HashSet::new();
                if let Some(dup) = node.ports.iter().find(|p| !ports.insert(p.id.as_str())) {
                    return Err(FormatError::DuplicatePort {
                        node: node.id,
                        port: dup.id.clone(),
                    });
                }
                nodes.insert(node.id, node);
            }
        }
        for edge in self.cells.iter().filter_map(Cell::as_edge) {
            for endpoint in [&edge.source, &edge.target] {
                match endpoint {
                    Endpoint::Port { node, port } => {
                        let Some(owner) = nodes.get(node) else {
                            return Err(FormatError::MissingNode {
                                edge: edge.id,
                                node: *node,
                            });
                        };
                        if owner.port(port).is_none() {
                            return Err(FormatError::MissingPort {
                                edge: edge.id,
                                node: *node,
                                port: port.clone(),
                            });
                        }
                    }
                    Endpoint::Point { x, y } => {
                        if !Point::new(*x, *y).is_finite() {
                            return Err(FormatError::InvalidGeometry(edge.id));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        serde_json::to_string_pretty(self).map_err(|e| FormatError::Encode(e.to_string()))
    }

    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            version: VERSION,
            cells: graph.cells().to_vec(),
        }
    }

    pub fn into_graph(self) -> Graph {
        Graph::from_cells(self.cells)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    /// Writes next to the target first so a failed save keeps the old file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        tracing::info!(path = %path.display(), cells = self.cells.len(), "saved document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellId;

    const SAMPLE: &str = r##"{
        "version": 1,
        "cells": [
            {"kind": "node", "id": 1, "shape": "custom-rect",
             "position": {"x": 10, "y": 20}, "size": {"width": 66, "height": 36},
             "attrs": {"text": {"text": "Start", "fontSize": 12}},
             "ports": [{"id": "right", "group": "right", "side": "right"}]},
            {"kind": "node", "id": 2, "shape": "custom-rect",
             "position": {"x": 200, "y": 20}, "size": {"width": 80, "height": 36},
             "ports": [{"id": "left", "group": "left", "side": "left"}]},
            {"kind": "edge", "id": 3,
             "source": {"type": "port", "node": 1, "port": "right"},
             "target": {"type": "port", "node": 2, "port": "left"},
             "attrs": {"line": {"stroke": "#A2B1C3", "strokeWidth": 2}}}
        ]
    }"##;

    #[test]
    fn parses_and_fills_defaults() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert_eq!(doc.cells.len(), 3);
        let edge = doc.cells[2].as_edge().unwrap();
        assert_eq!(edge.route, crate::model::RouteStyle::Orthogonal { radius: 8.0 });
        let node = doc.cells[0].as_node().unwrap();
        assert_eq!(node.label(), "Start");
        assert_eq!(node.attrs.number("text", "fontSize"), Some(12.0));
    }

    #[test]
    fn structural_errors_are_reported() {
        let bad_port = SAMPLE.replace("\"port\": \"left\"", "\"port\": \"top\"");
        assert_eq!(
            Document::parse(&bad_port),
            Err(FormatError::MissingPort {
                edge: CellId(3),
                node: CellId(2),
                port: "top".into()
            })
        );
        let dup = SAMPLE.replace("\"id\": 2,", "\"id\": 1,");
        assert_eq!(Document::parse(&dup), Err(FormatError::DuplicateId(CellId(1))));
        let zero = SAMPLE.replace("\"width\": 80", "\"width\": 0");
        assert_eq!(Document::parse(&zero), Err(FormatError::InvalidGeometry(CellId(2))));
        let version = SAMPLE.replace("\"version\": 1", "\"version\": 7");
        assert_eq!(Document::parse(&version), Err(FormatError::UnsupportedVersion(7)));
        assert!(matches!(Document::parse("{ nope"), Err(FormatError::Syntax(_))));
    }

    #[test]
    fn oversized_ids_are_rejected() {
        let huge = SAMPLE.replace("\"id\": 3,", "\"id\": 18446744073709551615,");
        assert_eq!(
            Document::parse(&huge),
            Err(FormatError::IdOutOfRange(CellId(u64::MAX)))
        );
        let edge = format!("\"id\": {},", MAX_CELL_ID);
        let largest = SAMPLE.replace("\"id\": 3,", &edge);
        assert!(Document::parse(&largest).is_ok());
    }

    #[test]
    fn repeated_port_ids_are_rejected() {
        let twice = SAMPLE.replace(
            r#"[{"id": "left", "group": "left", "side": "left"}]"#,
            r#"[{"id": "left", "group": "left", "side": "left"},
                {"id": "left", "group": "right", "side": "right"}]"#,
        );
        assert_eq!(
            Document::parse(&twice),
            Err(FormatError::DuplicatePort {
                node: CellId(2),
                port: "left".into()
            })
        );
    }

    #[test]
    fn write_then_read_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagram.json");
        let doc = Document::parse(SAMPLE).unwrap();
        doc.write(&path).unwrap();
        assert_eq!(Document::read(&path).unwrap(), doc);
        assert!(!dir.path().join("diagram.json.tmp").exists());
    }
}
