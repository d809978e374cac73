//! The cell store and the reversible changes applied to it.

use crate::model::{Cell, CellId, Edge, Endpoint, Node, Point, RectF, distance_to_segment};
use crate::route::{self, Anchor, EdgePath};

/// One reversible step. A history entry is an ordered list of these.
#[derive(Clone, Debug, PartialEq)]
pub enum CellChange {
    Insert { index: usize, cell: Cell },
    Remove { index: usize, cell: Cell },
    Update { before: Cell, after: Cell },
}

impl CellChange {
    pub fn id(&self) -> CellId {
        match self {
            CellChange::Insert { cell, .. } | CellChange::Remove { cell, .. } => cell.id(),
            CellChange::Update { after, .. } => after.id(),
        }
    }

    pub fn inverse(&self) -> CellChange {
        match self {
            CellChange::Insert { index, cell } => CellChange::Remove {
                index: *index,
                cell: cell.clone(),
            },
            CellChange::Remove { index, cell } => CellChange::Insert {
                index: *index,
                cell: cell.clone(),
            },
            CellChange::Update { before, after } => CellChange::Update {
                before: after.clone(),
                after: before.clone(),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOrigin {
    Edit,
    Undo,
    Redo,
    Load,
}

/// Fired after a mutation has fully committed.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEvent {
    pub origin: ChangeOrigin,
    pub added: Vec<CellId>,
    pub removed: Vec<CellId>,
    pub updated: Vec<CellId>,
}

impl GraphEvent {
    pub fn from_changes(origin: ChangeOrigin, changes: &[CellChange]) -> Self {
        let mut event = GraphEvent {
            origin,
            added: Vec::new(),
            removed: Vec::new(),
            updated: Vec::new(),
        };
        for change in changes {
            let list = match change {
                CellChange::Insert { .. } => &mut event.added,
                CellChange::Remove { .. } => &mut event.removed,
                CellChange::Update { .. } => &mut event.updated,
            };
            if !list.contains(&change.id()) {
                list.push(change.id());
            }
        }
        event
    }

    pub fn reload(ids: Vec<CellId>) -> Self {
        GraphEvent {
            origin: ChangeOrigin::Load,
            added: ids,
            removed: Vec::new(),
            updated: Vec::new(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.updated)
            .copied()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    cells: Vec<Cell>,
    next_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            next_id: 1,
        }
    }

    /// Takes ownership of already validated cells.
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        let next_id = cells
            .iter()
            .map(|c| c.id().0)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        Self { cells, next_id }
    }

    pub fn allocate_id(&mut self) -> CellId {
        let id = CellId(self.next_id.max(1));
        self.next_id = id.0.saturating_add(1);
        id
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn index_of(&self, id: CellId) -> Option<usize> {
        self.cells.iter().position(|c| c.id() == id)
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id() == id)
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.get(id).is_some()
    }

    pub fn node(&self, id: CellId) -> Option<&Node> {
        self.get(id).and_then(Cell::as_node)
    }

    pub fn edge(&self, id: CellId) -> Option<&Edge> {
        self.get(id).and_then(Cell::as_edge)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.cells.iter().filter_map(Cell::as_node)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.cells.iter().filter_map(Cell::as_edge)
    }

    pub fn next_z(&self) -> i32 {
        self.cells.iter().map(Cell::z).max().map_or(0, |z| z.saturating_add(1))
    }

    pub fn connected_edges(&self, node: CellId) -> Vec<CellId> {
        self.edges()
            .filter(|e| e.touches(node))
            .map(|e| e.id)
            .collect()
    }

    /// Applies a single change. Callers validate before building changes, so
    /// a change that no longer matches the store is skipped rather than
    /// partially applied.
    pub fn apply(&mut self, change: &CellChange) {
        match change {
            CellChange::Insert { index, cell } => {
                let at = (*index).min(self.cells.len());
                self.cells.insert(at, cell.clone());
            }
            CellChange::Remove { cell, .. } => {
                if let Some(at) = self.index_of(cell.id()) {
                    self.cells.remove(at);
                }
            }
            CellChange::Update { after, .. } => {
                if let Some(at) = self.index_of(after.id()) {
                    self.cells[at] = after.clone();
                }
            }
        }
        if let CellChange::Insert { cell, .. } = change {
            self.next_id = self.next_id.max(cell.id().0.saturating_add(1));
        }
    }

    pub fn apply_all(&mut self, changes: &[CellChange]) {
        for change in changes {
            self.apply(change);
        }
    }

    pub fn revert_all(&mut self, changes: &[CellChange]) {
        for change in changes.iter().rev() {
            self.apply(&change.inverse());
        }
    }

    /// Removal changes for `ids` plus every edge attached to a removed node,
    /// ordered so that applying them front to back keeps recorded indices
    /// valid.
    pub fn plan_removal(&self, ids: &[CellId]) -> Vec<CellChange> {
        let mut doomed: Vec<CellId> = Vec::new();
        for &id in ids {
            if let Some(cell) = self.get(id) {
                if !doomed.contains(&id) {
                    doomed.push(id);
                }
                if cell.is_node() {
                    for edge in self.connected_edges(id) {
                        if !doomed.contains(&edge) {
                            doomed.push(edge);
                        }
                    }
                }
            }
        }
        let mut indexed: Vec<(usize, &Cell)> = doomed
            .iter()
            .filter_map(|id| self.index_of(*id).map(|i| (i, &self.cells[i])))
            .collect();
        indexed.sort_by(|a, b| b.0.cmp(&a.0));
        indexed
            .into_iter()
            .map(|(index, cell)| CellChange::Remove {
                index,
                cell: cell.clone(),
            })
            .collect()
    }

    pub fn endpoint_anchor(&self, endpoint: &Endpoint) -> Option<Anchor> {
        match endpoint {
            Endpoint::Point { x, y } => Some(Anchor::free(Point::new(*x, *y))),
            Endpoint::Port { node, port } => {
                let node = self.node(*node)?;
                let side = node.port(port)?.side;
                Some(Anchor::on(node.port_anchor(port)?, side))
            }
        }
    }

    pub fn edge_path(&self, edge: &Edge) -> Option<EdgePath> {
        let from = self.endpoint_anchor(&edge.source)?;
        let to = self.endpoint_anchor(&edge.target)?;
        Some(route::route(edge.route, from, to))
    }

    /// Topmost node under `p`.
    pub fn node_at(&self, p: Point) -> Option<CellId> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_node().map(|n| (i, n)))
            .filter(|(_, n)| n.bounds().contains(p))
            .max_by_key(|(i, n)| (n.z, *i))
            .map(|(_, n)| n.id)
    }

    pub fn edge_near(&self, p: Point, tolerance: f32) -> Option<CellId> {
        self.edges()
            .filter_map(|e| {
                let points = self.edge_path(e)?.flatten();
                let d = points
                    .windows(2)
                    .map(|w| distance_to_segment(p, w[0], w[1]))
                    .fold(f32::INFINITY, f32::min);
                (d <= tolerance).then_some((e.id, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Nearest port within `radius`, optionally ignoring one node.
    pub fn port_near(
        &self,
        p: Point,
        radius: f32,
        exclude: Option<CellId>,
    ) -> Option<(CellId, String)> {
        self.nodes()
            .filter(|n| Some(n.id) != exclude)
            .flat_map(|n| {
                n.port_anchors()
                    .into_iter()
                    .map(move |(port, at)| (n.id, port.id.clone(), at.distance(p)))
            })
            .filter(|(_, _, d)| *d <= radius)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(node, port, _)| (node, port))
    }

    pub fn nodes_in_rect(&self, rect: RectF) -> Vec<CellId> {
        self.nodes()
            .filter(|n| rect.intersects(n.bounds()))
            .map(|n| n.id)
            .collect()
    }
}
