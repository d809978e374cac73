//! Flowchart diagram model and interaction engine.
//!
//! [`editor::Editor`] is the entry point: it owns the graph, the shape
//! registry, undo history, selection and clipboard, and routes every
//! mutation through them.

pub mod clipboard;
pub mod config;
pub mod connection;
pub mod document;
pub mod editor;
pub mod error;
pub mod graph;
pub mod history;
pub mod loader;
pub mod model;
pub mod registry;
pub mod remote;
pub mod route;
pub mod selection;
pub mod stencil;
pub mod transform;

pub use editor::Editor;
pub use error::{EditError, EditResult};
pub use model::{Cell, CellId, Edge, Endpoint, Node, Point, Size};
