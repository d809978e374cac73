//! Selected cells and the property form bound to them.

use crate::model::{Attrs, Cell, CellId};
use std::ops::RangeInclusive;

pub const FONT_SIZE_RANGE: RangeInclusive<f32> = 8.0..=72.0;
pub const SIZE_RANGE: RangeInclusive<f32> = 20.0..=500.0;

const DEFAULT_STROKE: &str = "#5F95FF";
const DEFAULT_FILL: &str = "#EFF4FF";
const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Ordered, duplicate-free set of ids.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    ids: Vec<CellId>,
}

impl Selection {
    pub fn ids(&self) -> &[CellId] {
        &self.ids
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn single(&self) -> Option<CellId> {
        match self.ids.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Returns whether the set changed.
    pub fn set(&mut self, ids: impl IntoIterator<Item = CellId>) -> bool {
        let mut next = Vec::new();
        for id in ids {
            if !next.contains(&id) {
                next.push(id);
            }
        }
        let changed = next != self.ids;
        self.ids = next;
        changed
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.ids.is_empty();
        self.ids.clear();
        changed
    }

    pub fn toggle(&mut self, id: CellId) {
        if let Some(at) = self.ids.iter().position(|x| *x == id) {
            self.ids.remove(at);
        } else {
            self.ids.push(id);
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(CellId) -> bool) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| keep(*id));
        before != self.ids.len()
    }
}

/// What the property panel shows for a single selected cell.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyView {
    pub id: CellId,
    pub label: String,
    pub stroke: String,
    pub font_size: f32,
    /// `None` for edges, which have no fill or box.
    pub fill: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl PropertyView {
    pub fn of(cell: &Cell) -> Self {
        let attrs = cell.attrs();
        let font_size = attrs
            .number("text", "fontSize")
            .map(|n| n as f32)
            .unwrap_or(DEFAULT_FONT_SIZE);
        match cell {
            Cell::Node(node) => PropertyView {
                id: node.id,
                label: node.label().to_string(),
                stroke: attrs.text("body", "stroke").unwrap_or(DEFAULT_STROKE).to_string(),
                font_size,
                fill: Some(attrs.text("body", "fill").unwrap_or(DEFAULT_FILL).to_string()),
                width: Some(node.size.width),
                height: Some(node.size.height),
            },
            Cell::Edge(edge) => PropertyView {
                id: edge.id,
                label: edge.label().to_string(),
                stroke: attrs.text("line", "stroke").unwrap_or(DEFAULT_STROKE).to_string(),
                font_size,
                fill: None,
                width: None,
                height: None,
            },
        }
    }

    pub fn is_node(&self) -> bool {
        self.width.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyEdit {
    Label(String),
    Stroke(String),
    Fill(String),
    FontSize(f32),
    Width(f32),
    Height(f32),
}

impl PropertyEdit {
    pub fn clamped(self) -> Self {
        let clamp = |v: f32, r: &RangeInclusive<f32>| v.clamp(*r.start(), *r.end());
        match self {
            PropertyEdit::FontSize(v) => PropertyEdit::FontSize(clamp(v, &FONT_SIZE_RANGE)),
            PropertyEdit::Width(v) => PropertyEdit::Width(clamp(v, &SIZE_RANGE)),
            PropertyEdit::Height(v) => PropertyEdit::Height(clamp(v, &SIZE_RANGE)),
            other => other,
        }
    }

    /// Attribute patch for text and colour edits. Geometry edits and edits
    /// that have no meaning for the cell yield `None`.
    pub fn attr_patch(&self, cell: &Cell) -> Option<Attrs> {
        let is_node = cell.is_node();
        match self {
            PropertyEdit::Label(text) if is_node => {
                Some(Attrs::new().with("text", "text", text.as_str()))
            }
            PropertyEdit::Label(text) => Some(Attrs::new().with("label", "text", text.as_str())),
            PropertyEdit::Stroke(color) if is_node => {
                Some(Attrs::new().with("body", "stroke", color.as_str()))
            }
            PropertyEdit::Stroke(color) => Some(Attrs::new().with("line", "stroke", color.as_str())),
            PropertyEdit::Fill(color) if is_node => {
                Some(Attrs::new().with("body", "fill", color.as_str()))
            }
            PropertyEdit::FontSize(size) => Some(Attrs::new().with("text", "fontSize", *size)),
            PropertyEdit::Fill(_) | PropertyEdit::Width(_) | PropertyEdit::Height(_) => None,
        }
    }
}

/// Hover-driven port visibility. Last write wins; repeating a state is a
/// no-op so bursts of enter/leave events stay cheap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortVisibility {
    visible: bool,
}

impl PortVisibility {
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Returns whether anything changed.
    pub fn set(&mut self, visible: bool) -> bool {
        let changed = self.visible != visible;
        self.visible = visible;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Endpoint, Node, Point, RouteStyle, Size};

    #[test]
    fn set_dedups_and_reports_changes() {
        let mut sel = Selection::default();
        assert!(sel.set([CellId(1), CellId(2), CellId(1)]));
        assert_eq!(sel.ids(), &[CellId(1), CellId(2)]);
        assert!(!sel.set([CellId(1), CellId(2)]));
        sel.toggle(CellId(1));
        assert_eq!(sel.single(), Some(CellId(2)));
        sel.toggle(CellId(3));
        assert_eq!(sel.single(), None);
        assert!(sel.clear());
        assert!(!sel.clear());
    }

    #[test]
    fn node_view_falls_back_to_panel_defaults() {
        let node = Cell::Node(Node {
            id: CellId(4),
            shape: "custom-rect".into(),
            position: Point::new(0.0, 0.0),
            size: Size::new(66.0, 36.0),
            z: 0,
            attrs: Attrs::new().with("text", "text", "Start"),
            ports: Vec::new(),
        });
        let view = PropertyView::of(&node);
        assert_eq!(view.label, "Start");
        assert_eq!(view.stroke, "#5F95FF");
        assert_eq!(view.fill.as_deref(), Some("#EFF4FF"));
        assert_eq!(view.font_size, 12.0);
        assert_eq!((view.width, view.height), (Some(66.0), Some(36.0)));
    }

    #[test]
    fn edge_edits_target_line_and_label_groups() {
        let edge = Cell::Edge(Edge {
            id: CellId(9),
            source: Endpoint::port(CellId(1), "out"),
            target: Endpoint::port(CellId(2), "in"),
            route: RouteStyle::default(),
            z: 0,
            attrs: Attrs::new().with("line", "stroke", "#A2B1C3"),
        });
        let view = PropertyView::of(&edge);
        assert!(!view.is_node());
        assert_eq!(view.stroke, "#A2B1C3");
        let patch = PropertyEdit::Stroke("#000".into()).attr_patch(&edge).unwrap();
        assert_eq!(patch.text("line", "stroke"), Some("#000"));
        let patch = PropertyEdit::Label("yes".into()).attr_patch(&edge).unwrap();
        assert_eq!(patch.text("label", "text"), Some("yes"));
        assert_eq!(PropertyEdit::Fill("#fff".into()).attr_patch(&edge), None);
    }

    #[test]
    fn numeric_edits_clamp_to_form_limits() {
        assert_eq!(PropertyEdit::FontSize(100.0).clamped(), PropertyEdit::FontSize(72.0));
        assert_eq!(PropertyEdit::Width(5.0).clamped(), PropertyEdit::Width(20.0));
        assert_eq!(PropertyEdit::Height(300.0).clamped(), PropertyEdit::Height(300.0));
    }

    #[test]
    fn hover_toggle_is_idempotent() {
        let mut ports = PortVisibility::default();
        assert!(ports.set(true));
        assert!(!ports.set(true));
        assert!(ports.visible());
        assert!(ports.set(false));
        assert!(!ports.set(false));
    }
}
