//! The editing session.
//!
//! Every mutation follows the same path: check inputs, build the full list
//! of [`CellChange`]s, apply them, record one history entry, prune the
//! selection, then notify observers. Nothing touches the graph until the
//! checks have passed, so a rejected edit leaves no trace.

use crate::clipboard::{ClipboardBuffer, CrossingEdges};
use crate::connection::ConnectionRules;
use crate::document::Document;
use crate::error::{ConnectionError, EditError, EditResult, FormatError};
use crate::graph::{CellChange, ChangeOrigin, Graph, GraphEvent};
use crate::history::{DEFAULT_LIMIT, History, HistoryEntry};
use crate::model::{Attrs, Cell, CellId, Edge, Endpoint, Node, Point, RectF, RouteStyle, Size};
use crate::registry::ShapeRegistry;
use crate::selection::{PortVisibility, PropertyEdit, PropertyView, Selection};
use crate::stencil::{DEFAULT_NODE_SHAPE, MarkerNode};

pub type Observer = Box<dyn FnMut(&GraphEvent)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

#[derive(Clone, Debug, PartialEq)]
pub struct EditorConfig {
    pub rules: ConnectionRules,
    pub history_limit: usize,
    pub crossing_edges: CrossingEdges,
    pub default_route: RouteStyle,
    pub paste_offset: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            rules: ConnectionRules::default(),
            history_limit: DEFAULT_LIMIT,
            crossing_edges: CrossingEdges::Skip,
            default_route: RouteStyle::default(),
            paste_offset: 32.0,
        }
    }
}

pub fn default_edge_attrs() -> Attrs {
    Attrs::new()
        .with("line", "stroke", "#A2B1C3")
        .with("line", "strokeWidth", 2)
        .with("line", "targetMarker", "block")
}

pub struct Editor {
    graph: Graph,
    registry: ShapeRegistry,
    config: EditorConfig,
    history: History,
    selection: Selection,
    properties: Option<PropertyView>,
    clipboard: Option<ClipboardBuffer>,
    /// Bumped on every load; the clipboard remembers the value it was
    /// captured under.
    generation: u64,
    clipboard_generation: u64,
    ports: PortVisibility,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_registry(ShapeRegistry::with_builtins(), config)
    }

    pub fn with_registry(registry: ShapeRegistry, config: EditorConfig) -> Self {
        Self {
            graph: Graph::new(),
            registry,
            history: History::new(config.history_limit),
            config,
            selection: Selection::default(),
            properties: None,
            clipboard: None,
            generation: 0,
            clipboard_generation: 0,
            ports: PortVisibility::default(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Registering templates is not an undoable edit.
    pub fn registry_mut(&mut self) -> &mut ShapeRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn rules(&self) -> &ConnectionRules {
        &self.config.rules
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected ids that are nodes, in selection order.
    pub fn selected_nodes(&self) -> Vec<CellId> {
        self.selection
            .ids()
            .iter()
            .copied()
            .filter(|id| self.graph.node(*id).is_some())
            .collect()
    }

    pub fn properties(&self) -> Option<&PropertyView> {
        self.properties.as_ref()
    }

    pub fn clipboard(&self) -> Option<&ClipboardBuffer> {
        self.clipboard.as_ref()
    }

    pub fn ports_visible(&self) -> bool {
        self.ports.visible()
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&GraphEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        before != self.observers.len()
    }

    fn notify(&mut self, event: GraphEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&event);
        }
    }

    fn refresh_selection(&mut self) {
        let graph = &self.graph;
        self.selection.retain(|id| graph.contains(id));
        self.properties = self
            .selection
            .single()
            .and_then(|id| self.graph.get(id))
            .map(PropertyView::of);
    }

    fn commit(&mut self, label: &str, changes: Vec<CellChange>) {
        if changes.is_empty() {
            return;
        }
        self.graph.apply_all(&changes);
        let event = GraphEvent::from_changes(ChangeOrigin::Edit, &changes);
        tracing::debug!(label, changes = changes.len(), "commit");
        self.history.record(HistoryEntry::new(label, changes));
        self.refresh_selection();
        self.notify(event);
    }

    fn require(&self, id: CellId) -> EditResult<&Cell> {
        self.graph.get(id).ok_or(EditError::UnknownCell(id))
    }

    fn require_node(&self, id: CellId) -> EditResult<&Node> {
        self.require(id)?.as_node().ok_or(EditError::NotANode(id))
    }

    fn update_change(&self, id: CellId, edit: impl FnOnce(&mut Cell)) -> EditResult<Option<CellChange>> {
        let before = self.require(id)?.clone();
        let mut after = before.clone();
        edit(&mut after);
        Ok((after != before).then_some(CellChange::Update { before, after }))
    }

    // ---- mutations -------------------------------------------------------

    pub fn add_node(&mut self, shape: &str, position: Point, overrides: &Attrs) -> EditResult<CellId> {
        let resolved = self.registry.resolve(shape)?;
        let id = self.graph.allocate_id();
        if !position.is_finite() {
            return Err(EditError::InvalidGeometry(id));
        }
        let node = Node {
            id,
            shape: shape.to_string(),
            position,
            size: resolved.size,
            z: self.graph.next_z(),
            attrs: resolved.attrs.merged(overrides),
            ports: resolved.instantiate_ports(),
        };
        let index = self.graph.len();
        self.commit(
            "add node",
            vec![CellChange::Insert {
                index,
                cell: Cell::Node(node),
            }],
        );
        Ok(id)
    }

    pub fn add_edge(
        &mut self,
        source: Endpoint,
        target: Endpoint,
        route: Option<RouteStyle>,
    ) -> Result<CellId, ConnectionError> {
        if let Err(err) = self.config.rules.validate(&self.graph, &source, &target) {
            tracing::warn!(%err, "edge rejected");
            return Err(err);
        }
        let id = self.graph.allocate_id();
        let edge = Edge {
            id,
            source,
            target,
            route: route.unwrap_or(self.config.default_route),
            z: 0,
            attrs: default_edge_attrs(),
        };
        let index = self.graph.len();
        self.commit(
            "add edge",
            vec![CellChange::Insert {
                index,
                cell: Cell::Edge(edge),
            }],
        );
        Ok(id)
    }

    /// Removes `ids` and every edge attached to a removed node, as one
    /// undo step. Returns everything that was removed.
    pub fn remove_cells(&mut self, ids: &[CellId]) -> EditResult<Vec<CellId>> {
        self.remove_labelled("delete", ids)
    }

    fn remove_labelled(&mut self, label: &str, ids: &[CellId]) -> EditResult<Vec<CellId>> {
        for id in ids {
            self.require(*id)?;
        }
        let plan = self.graph.plan_removal(ids);
        let removed = plan.iter().map(CellChange::id).collect();
        self.commit(label, plan);
        Ok(removed)
    }

    pub fn remove_selection(&mut self) -> EditResult<Vec<CellId>> {
        let ids = self.selection.ids().to_vec();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.remove_cells(&ids)
    }

    /// Merges `partial` into the cell's attributes. Groups and keys not
    /// named in `partial` are left alone.
    pub fn update_attrs(&mut self, id: CellId, partial: &Attrs) -> EditResult<()> {
        let change = self.update_change(id, |cell| cell.attrs_mut().merge(partial))?;
        self.commit("edit attributes", change.into_iter().collect());
        Ok(())
    }

    pub fn resize(&mut self, id: CellId, width: f32, height: f32) -> EditResult<()> {
        self.require_node(id)?;
        let size = Size::new(width, height);
        if !size.is_valid() {
            return Err(EditError::InvalidGeometry(id));
        }
        let change = self.update_change(id, |cell| {
            if let Cell::Node(node) = cell {
                node.size = size;
            }
        })?;
        self.commit("resize", change.into_iter().collect());
        Ok(())
    }

    pub fn move_node(&mut self, id: CellId, position: Point) -> EditResult<()> {
        self.require_node(id)?;
        if !position.is_finite() {
            return Err(EditError::InvalidGeometry(id));
        }
        let change = self.update_change(id, |cell| {
            if let Cell::Node(node) = cell {
                node.position = position;
            }
        })?;
        self.commit("move", change.into_iter().collect());
        Ok(())
    }

    pub fn move_nodes(&mut self, ids: &[CellId], delta: Point) -> EditResult<()> {
        let mut changes = Vec::with_capacity(ids.len());
        for &id in ids {
            let node = self.require_node(id)?;
            let position = node.position.translate(delta);
            if !position.is_finite() {
                return Err(EditError::InvalidGeometry(id));
            }
            let change = self.update_change(id, |cell| {
                if let Cell::Node(node) = cell {
                    node.position = position;
                }
            })?;
            changes.extend(change);
        }
        self.commit("move", changes);
        Ok(())
    }

    /// Drops every edge attached to `node`.
    pub fn clear_connections(&mut self, node: CellId) -> EditResult<Vec<CellId>> {
        self.require_node(node)?;
        let edges = self.graph.connected_edges(node);
        self.remove_labelled("clear connections", &edges)
    }

    pub fn set_route(&mut self, id: CellId, route: RouteStyle) -> EditResult<()> {
        let cell = self.require(id)?;
        if cell.is_node() {
            return Ok(());
        }
        let change = self.update_change(id, |cell| {
            if let Cell::Edge(edge) = cell {
                edge.route = route;
            }
        })?;
        self.commit("edge style", change.into_iter().collect());
        Ok(())
    }

    /// Groups every mutation until [`Editor::commit_batch`] into one undo
    /// step, e.g. all the moves of one drag.
    pub fn begin_batch(&mut self, label: &str) -> bool {
        self.history.begin_batch(label)
    }

    pub fn commit_batch(&mut self) -> bool {
        self.history.commit_batch()
    }

    pub fn in_batch(&self) -> bool {
        self.history.in_batch()
    }

    // ---- selection -------------------------------------------------------

    pub fn select(&mut self, ids: &[CellId]) {
        let graph = &self.graph;
        self.selection
            .set(ids.iter().copied().filter(|id| graph.contains(*id)));
        self.refresh_selection();
    }

    pub fn toggle(&mut self, id: CellId) {
        if self.graph.contains(id) {
            self.selection.toggle(id);
            self.refresh_selection();
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.properties = None;
    }

    /// Applies a property-form edit to the single selected cell. Does
    /// nothing when zero or several cells are selected.
    pub fn apply_property(&mut self, edit: PropertyEdit) -> EditResult<()> {
        let Some(id) = self.selection.single() else {
            return Ok(());
        };
        let edit = edit.clamped();
        let size = self.require(id)?.as_node().map(|n| n.size);
        match (&edit, size) {
            (PropertyEdit::Width(w), Some(size)) => self.resize(id, *w, size.height),
            (PropertyEdit::Height(h), Some(size)) => self.resize(id, size.width, *h),
            _ => match edit.attr_patch(self.require(id)?) {
                Some(patch) => self.update_attrs(id, &patch),
                None => Ok(()),
            },
        }
    }

    pub fn set_ports_visible(&mut self, visible: bool) -> bool {
        self.ports.set(visible)
    }

    // ---- history ---------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    pub fn undo(&mut self) -> bool {
        self.history.commit_batch();
        let Some(entry) = self.history.undo(&mut self.graph) else {
            return false;
        };
        let inverse: Vec<CellChange> = entry.changes.iter().rev().map(CellChange::inverse).collect();
        let touched = entry.touched();
        self.after_history_move(ChangeOrigin::Undo, &inverse, &touched);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.history.commit_batch();
        let Some(entry) = self.history.redo(&mut self.graph) else {
            return false;
        };
        let changes = entry.changes.clone();
        let touched = entry.touched();
        self.after_history_move(ChangeOrigin::Redo, &changes, &touched);
        true
    }

    fn after_history_move(&mut self, origin: ChangeOrigin, changes: &[CellChange], touched: &[CellId]) {
        let graph = &self.graph;
        self.selection
            .set(touched.iter().copied().filter(|id| graph.contains(*id)));
        self.refresh_selection();
        self.notify(GraphEvent::from_changes(origin, changes));
    }

    // ---- clipboard -------------------------------------------------------

    /// Returns how many cells were captured. Copying nothing keeps the
    /// previous clipboard.
    pub fn copy(&mut self, ids: &[CellId]) -> usize {
        let buffer = ClipboardBuffer::capture(&self.graph, ids, self.config.crossing_edges);
        if buffer.is_empty() {
            return 0;
        }
        let count = buffer.len();
        tracing::debug!(nodes = buffer.nodes.len(), edges = buffer.edges.len(), "copy");
        self.clipboard = Some(buffer);
        self.clipboard_generation = self.generation;
        count
    }

    pub fn copy_selection(&mut self) -> usize {
        let ids = self.selection.ids().to_vec();
        self.copy(&ids)
    }

    /// Copy followed by removal, recorded as one undo step. Everything in
    /// `ids` is removed even when the copy captured nothing, e.g. a lone
    /// edge.
    pub fn cut(&mut self, ids: &[CellId]) -> EditResult<Vec<CellId>> {
        for id in ids {
            self.require(*id)?;
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.copy(ids);
        self.remove_labelled("cut", ids)
    }

    pub fn cut_selection(&mut self) -> EditResult<Vec<CellId>> {
        let ids = self.selection.ids().to_vec();
        self.cut(&ids)
    }

    /// Pastes at the configured offset from the copied positions.
    pub fn paste(&mut self) -> Vec<CellId> {
        let d = self.config.paste_offset;
        self.paste_at_offset(Point::new(d, d))
    }

    pub fn paste_at_offset(&mut self, offset: Point) -> Vec<CellId> {
        let Some(buffer) = self.clipboard.as_ref() else {
            return Vec::new();
        };
        let cells = if self.clipboard_generation == self.generation {
            buffer.materialize(&mut self.graph, offset, &self.config.rules)
        } else {
            buffer
                .detached()
                .materialize(&mut self.graph, offset, &self.config.rules)
        };
        let ids: Vec<CellId> = cells.iter().map(Cell::id).collect();
        let start = self.graph.len();
        let changes = cells
            .into_iter()
            .enumerate()
            .map(|(i, cell)| CellChange::Insert {
                index: start + i,
                cell,
            })
            .collect();
        self.commit("paste", changes);
        self.selection.set(ids.iter().copied());
        self.refresh_selection();
        tracing::info!(cells = ids.len(), "paste");
        ids
    }

    // ---- stencil ---------------------------------------------------------

    /// Turns a palette marker into a real node centred on `at`. Markers
    /// whose kind cannot be determined become a default node carrying the
    /// marker's label.
    pub fn drop_marker(&mut self, marker: &MarkerNode, at: Point) -> EditResult<CellId> {
        let (shape, overrides) = match marker.resolve_kind() {
            Some(kind) => (kind.shape(), kind.overrides()),
            None => {
                tracing::debug!(label = %marker.label, "unrecognised marker, using default node");
                (
                    DEFAULT_NODE_SHAPE,
                    Attrs::new().with("text", "text", marker.label.as_str()),
                )
            }
        };
        let size = self.registry.resolve(shape)?.size;
        let position = at.offset(-size.width * 0.5, -size.height * 0.5);
        let id = self.add_node(shape, position, &overrides)?;
        self.select(&[id]);
        Ok(id)
    }

    // ---- documents -------------------------------------------------------

    pub fn document(&self) -> Document {
        Document::from_graph(&self.graph)
    }

    /// Replaces the whole graph. Selection and history start over; the
    /// clipboard is kept so cells can be carried between documents.
    pub fn load_document(&mut self, document: Document) -> Result<(), FormatError> {
        document.validate()?;
        let count = document.cells.len();
        self.graph = document.into_graph();
        self.generation = self.generation.wrapping_add(1);
        self.history.clear();
        self.selection.clear();
        self.properties = None;
        let ids = self.graph.cells().iter().map(Cell::id).collect();
        self.notify(GraphEvent::reload(ids));
        tracing::info!(cells = count, "document loaded");
        Ok(())
    }

    pub fn load_json(&mut self, text: &str) -> Result<(), FormatError> {
        let document = Document::parse(text)?;
        self.load_document(document)
    }

    // ---- queries ---------------------------------------------------------

    pub fn node_at(&self, p: Point) -> Option<CellId> {
        self.graph.node_at(p)
    }

    pub fn edge_near(&self, p: Point, tolerance: f32) -> Option<CellId> {
        self.graph.edge_near(p, tolerance)
    }

    pub fn port_near(&self, p: Point, exclude: Option<CellId>) -> Option<(CellId, String)> {
        self.graph.port_near(p, self.config.rules.snap_radius, exclude)
    }

    pub fn nodes_in_rect(&self, rect: RectF) -> Vec<CellId> {
        self.graph.nodes_in_rect(rect)
    }

    /// Endpoint for a connector released at `p`.
    pub fn snap_endpoint(&self, p: Point, exclude: Option<CellId>) -> Endpoint {
        self.config.rules.snap(&self.graph, p, exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::TemplateKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn editor() -> Editor {
        Editor::default()
    }

    fn process(ed: &mut Editor, x: f32, label: &str) -> CellId {
        ed.add_node(
            "custom-rect",
            Point::new(x, 0.0),
            &Attrs::new().with("text", "text", label),
        )
        .unwrap()
    }

    fn link(ed: &mut Editor, a: CellId, b: CellId) -> CellId {
        ed.add_edge(Endpoint::port(a, "right"), Endpoint::port(b, "left"), None)
            .unwrap()
    }

    fn node(ed: &Editor, id: CellId) -> &Node {
        ed.graph().node(id).unwrap()
    }

    #[test]
    fn add_node_merges_template_and_overrides() {
        let mut ed = editor();
        let id = process(&mut ed, 10.0, "Start");
        let n = node(&ed, id);
        assert_eq!(n.size, Size::new(66.0, 36.0));
        assert_eq!(n.label(), "Start");
        assert_eq!(n.attrs.text("body", "stroke"), Some("#5F95FF"));
        assert_eq!(n.ports.len(), 4);
        assert!(ed.can_undo());
        assert_eq!(
            ed.add_node("nope", Point::new(0.0, 0.0), &Attrs::new()),
            Err(EditError::Shape(crate::error::ShapeError::UnknownShape("nope".into())))
        );
    }

    #[test]
    fn rejected_edge_changes_nothing() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        let before = ed.document();
        let depth = ed.history.undo_depth();
        let err = ed
            .add_edge(Endpoint::port(a, "right"), Endpoint::point(Point::new(300.0, 0.0)), None)
            .unwrap_err();
        assert_eq!(err, ConnectionError::BlankEndpoint);
        assert_eq!(ed.document(), before);
        assert_eq!(ed.history.undo_depth(), depth);
    }

    #[test]
    fn delete_cascades_in_one_step_and_undo_restores() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        let b = process(&mut ed, 200.0, "b");
        let c = process(&mut ed, 400.0, "c");
        let ab = link(&mut ed, a, b);
        let bc = link(&mut ed, b, c);
        let before = ed.document();
        ed.select(&[b, ab]);

        let removed = ed.remove_cells(&[b]).unwrap();
        assert_eq!(removed.len(), 3);
        assert!(ed.graph().get(ab).is_none() && ed.graph().get(bc).is_none());
        assert!(ed.selection().is_empty());

        assert!(ed.undo());
        assert_eq!(ed.document(), before);
        assert_eq!(ed.undo_label(), Some("add edge"));
        assert_eq!(ed.selection().len(), 3);
    }

    #[test]
    fn unknown_ids_are_rejected_before_any_change() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        assert_eq!(
            ed.remove_cells(&[a, CellId(99)]),
            Err(EditError::UnknownCell(CellId(99)))
        );
        assert!(ed.graph().contains(a));
        let e = {
            let b = process(&mut ed, 200.0, "b");
            link(&mut ed, a, b)
        };
        assert_eq!(ed.resize(e, 10.0, 10.0), Err(EditError::NotANode(e)));
        assert_eq!(ed.resize(a, -1.0, 10.0), Err(EditError::InvalidGeometry(a)));
        assert_eq!(
            ed.move_node(a, Point::new(f32::NAN, 0.0)),
            Err(EditError::InvalidGeometry(a))
        );
    }

    #[test]
    fn property_edits_are_partial() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "old");
        ed.select(&[a]);
        assert_eq!(ed.properties().map(|p| p.label.as_str()), Some("old"));

        ed.apply_property(PropertyEdit::Label("new".into())).unwrap();
        ed.apply_property(PropertyEdit::Stroke("#ff0000".into())).unwrap();
        ed.apply_property(PropertyEdit::Width(1000.0)).unwrap();
        let n = node(&ed, a);
        assert_eq!(n.label(), "new");
        assert_eq!(n.attrs.text("body", "stroke"), Some("#ff0000"));
        assert_eq!(n.attrs.text("body", "fill"), Some("#EFF4FF"));
        assert_eq!(n.attrs.number("text", "fontSize"), Some(12.0));
        assert_eq!(n.size, Size::new(500.0, 36.0));
        let view = ed.properties().unwrap();
        assert_eq!(view.label, "new");
        assert_eq!(view.width, Some(500.0));

        let b = process(&mut ed, 200.0, "b");
        ed.select(&[a, b]);
        assert!(ed.properties().is_none());
        ed.apply_property(PropertyEdit::Label("ignored".into())).unwrap();
        assert_eq!(node(&ed, b).label(), "b");
    }

    #[test]
    fn new_edit_clears_redo_and_limit_is_enforced() {
        let mut ed = Editor::new(EditorConfig {
            history_limit: 3,
            ..EditorConfig::default()
        });
        let a = process(&mut ed, 0.0, "a");
        for x in 1..=5 {
            ed.move_node(a, Point::new(x as f32 * 10.0, 0.0)).unwrap();
        }
        let mut undone = 0;
        while ed.undo() {
            undone += 1;
        }
        assert_eq!(undone, 3);
        assert_eq!(node(&ed, a).position, Point::new(20.0, 0.0));
        assert!(ed.can_redo());
        ed.move_node(a, Point::new(0.0, 0.0)).unwrap();
        assert!(!ed.can_redo());
    }

    #[test]
    fn drag_batch_is_one_undo_step() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        let b = process(&mut ed, 100.0, "b");
        ed.begin_batch("drag");
        for _ in 0..10 {
            ed.move_nodes(&[a, b], Point::new(1.0, 2.0)).unwrap();
        }
        ed.commit_batch();
        assert_eq!(node(&ed, a).position, Point::new(10.0, 20.0));
        assert_eq!(ed.undo_label(), Some("drag"));
        ed.undo();
        assert_eq!(node(&ed, a).position, Point::new(0.0, 0.0));
        assert_eq!(node(&ed, b).position, Point::new(100.0, 0.0));
        ed.redo();
        assert_eq!(node(&ed, b).position, Point::new(110.0, 20.0));
    }

    #[test]
    fn paste_duplicates_with_fresh_ids_and_rewired_edges() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        let b = process(&mut ed, 200.0, "b");
        let ab = link(&mut ed, a, b);
        assert_eq!(ed.copy(&[a, b]), 3);

        let pasted = ed.paste();
        assert_eq!(pasted.len(), 3);
        assert!(!pasted.contains(&a) && !pasted.contains(&b) && !pasted.contains(&ab));
        assert_eq!(ed.selection().ids(), pasted.as_slice());
        let na = node(&ed, pasted[0]);
        assert_eq!(na.position, Point::new(32.0, 32.0));
        assert_eq!(na.label(), "a");
        let e = ed.graph().edge(pasted[2]).unwrap();
        assert_eq!(e.source, Endpoint::port(pasted[0], "right"));
        assert_eq!(e.target, Endpoint::port(pasted[1], "left"));

        ed.undo();
        assert_eq!(ed.graph().len(), 3);
        assert!(ed.selection().is_empty());
    }

    #[test]
    fn empty_clipboard_paste_is_a_no_op() {
        let mut ed = editor();
        process(&mut ed, 0.0, "a");
        let depth = ed.history.undo_depth();
        assert!(ed.paste().is_empty());
        assert_eq!(ed.history.undo_depth(), depth);
    }

    #[test]
    fn cut_is_one_entry() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        let b = process(&mut ed, 200.0, "b");
        link(&mut ed, a, b);
        let before = ed.document();
        ed.select(&[a]);
        let removed = ed.cut_selection().unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(ed.undo_label(), Some("cut"));
        ed.undo();
        assert_eq!(ed.document(), before);
        let pasted = ed.paste();
        assert_eq!(pasted.len(), 1);
    }

    #[test]
    fn cut_removes_selected_edges_too() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        let b = process(&mut ed, 200.0, "b");
        let c = process(&mut ed, 400.0, "c");
        let ab = link(&mut ed, a, b);
        let bc = link(&mut ed, b, c);

        ed.select(&[ab]);
        assert_eq!(ed.cut_selection().unwrap(), vec![ab]);
        assert!(!ed.graph().contains(ab));
        assert!(ed.clipboard().is_none());
        assert_eq!(ed.undo_label(), Some("cut"));

        ed.select(&[bc, a]);
        let removed = ed.cut_selection().unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!ed.graph().contains(bc) && !ed.graph().contains(a));
        assert_eq!(ed.clipboard().map(ClipboardBuffer::len), Some(1));

        ed.undo();
        ed.undo();
        assert!(ed.graph().contains(ab) && ed.graph().contains(bc));
        assert!(ed.cut(&[]).unwrap().is_empty());
    }

    #[test]
    fn selected_nodes_skip_edges() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        let b = process(&mut ed, 200.0, "b");
        let ab = link(&mut ed, a, b);
        ed.select(&[ab, b]);
        assert_eq!(ed.selected_nodes(), vec![b]);
        let nodes = ed.selected_nodes();
        ed.move_nodes(&nodes, Point::new(5.0, 0.0)).unwrap();
        assert_eq!(node(&ed, b).position, Point::new(205.0, 0.0));
    }

    #[test]
    fn extreme_loaded_ids_and_z_stay_usable() {
        let mut ed = editor();
        let huge = r#"{"version": 1, "cells": [
            {"kind": "node", "id": 18446744073709551615, "shape": "custom-rect",
             "position": {"x": 0, "y": 0}, "size": {"width": 10, "height": 10}}]}"#;
        assert_eq!(
            ed.load_json(huge),
            Err(FormatError::IdOutOfRange(CellId(u64::MAX)))
        );
        assert!(ed.graph().is_empty());

        let top = r#"{"version": 1, "cells": [
            {"kind": "node", "id": 7, "shape": "custom-rect", "z": 2147483647,
             "position": {"x": 0, "y": 0}, "size": {"width": 10, "height": 10}}]}"#;
        ed.load_json(top).unwrap();
        let id = process(&mut ed, 100.0, "b");
        assert_eq!(id, CellId(8));
        assert_eq!(node(&ed, id).z, i32::MAX);
        ed.copy(&[id]);
        let pasted = ed.paste();
        assert_eq!(node(&ed, pasted[0]).z, i32::MAX);
    }

    #[test]
    fn reattached_ends_do_not_cross_documents() {
        let mut ed = Editor::new(EditorConfig {
            crossing_edges: CrossingEdges::Reattach,
            ..EditorConfig::default()
        });
        let a = process(&mut ed, 0.0, "a");
        let b = process(&mut ed, 200.0, "b");
        link(&mut ed, a, b);
        assert_eq!(ed.copy(&[b]), 2);

        // same document: the outside end still points at `a`
        let pasted = ed.paste();
        assert_eq!(pasted.len(), 2);
        ed.undo();

        // a fresh document reusing id 1 for an unrelated node
        let mut other = editor();
        process(&mut other, 500.0, "stranger");
        ed.load_document(other.document()).unwrap();
        let pasted = ed.paste();
        assert_eq!(pasted.len(), 1);
        assert!(ed.graph().edges().next().is_none());
    }

    #[test]
    fn markers_resolve_by_tag_then_unique_label() {
        let mut ed = editor();
        let id = ed
            .drop_marker(&MarkerNode::tagged(TemplateKind::Condition), Point::new(300.0, 300.0))
            .unwrap();
        let n = node(&ed, id);
        assert_eq!(n.shape, "condition-node");
        assert_eq!(n.center(), Point::new(300.0, 300.0));
        assert_eq!(ed.selection().single(), Some(id));

        let id = ed
            .drop_marker(&MarkerNode::untagged("Logic node"), Point::new(0.0, 0.0))
            .unwrap();
        assert_eq!(node(&ed, id).shape, "logic-node");

        let id = ed
            .drop_marker(&MarkerNode::untagged("Something else"), Point::new(0.0, 0.0))
            .unwrap();
        let n = node(&ed, id);
        assert_eq!(n.shape, DEFAULT_NODE_SHAPE);
        assert_eq!(n.label(), "Something else");
    }

    #[test]
    fn load_resets_session_but_keeps_clipboard() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        ed.select(&[a]);
        ed.copy_selection();

        let mut other = editor();
        process(&mut other, 50.0, "x");
        let json = other.document().to_json().unwrap();

        ed.load_json(&json).unwrap();
        assert!(ed.selection().is_empty());
        assert!(!ed.can_undo() && !ed.can_redo());
        assert_eq!(ed.graph().len(), 1);
        let pasted = ed.paste();
        assert_eq!(pasted.len(), 1);
        assert!(ed.graph().get(pasted[0]).is_some());

        let before = ed.document();
        assert!(ed.load_json("{\"version\": 1, \"cells\": [}").is_err());
        assert_eq!(ed.document(), before);
        assert!(ed.can_undo());
    }

    #[test]
    fn observers_see_committed_changes() {
        let mut ed = editor();
        let seen: Rc<RefCell<Vec<GraphEvent>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let sub = ed.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let a = process(&mut ed, 0.0, "a");
        ed.undo();
        ed.redo();
        let _ = ed.add_edge(Endpoint::port(a, "right"), Endpoint::point(Point::new(1.0, 1.0)), None);
        {
            let events = seen.borrow();
            assert_eq!(events.len(), 3);
            assert_eq!(events[0].origin, ChangeOrigin::Edit);
            assert_eq!(events[0].added, vec![a]);
            assert_eq!(events[1].origin, ChangeOrigin::Undo);
            assert_eq!(events[1].removed, vec![a]);
            assert_eq!(events[2].origin, ChangeOrigin::Redo);
        }
        assert!(ed.unsubscribe(sub));
        process(&mut ed, 100.0, "b");
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn clear_connections_keeps_the_node() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        let b = process(&mut ed, 200.0, "b");
        let c = process(&mut ed, 400.0, "c");
        link(&mut ed, a, b);
        link(&mut ed, b, c);
        let removed = ed.clear_connections(b).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(ed.graph().contains(b));
        assert_eq!(ed.graph().edges().count(), 0);
        assert_eq!(ed.undo_label(), Some("clear connections"));
    }

    #[test]
    fn hover_and_queries() {
        let mut ed = editor();
        let a = process(&mut ed, 0.0, "a");
        assert!(ed.set_ports_visible(true));
        assert!(!ed.set_ports_visible(true));
        assert_eq!(ed.node_at(Point::new(5.0, 5.0)), Some(a));
        // "left" port of a sits at (0, 18)
        assert_eq!(
            ed.snap_endpoint(Point::new(-10.0, 20.0), None),
            Endpoint::port(a, "left")
        );
        assert_eq!(
            ed.nodes_in_rect(RectF::from_corners(Point::new(-1.0, -1.0), Point::new(2.0, 2.0))),
            vec![a]
        );
    }
}
