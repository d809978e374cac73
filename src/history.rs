//! Undo/redo stacks of inverse-capable cell changes.

use crate::graph::{CellChange, Graph};
use crate::model::CellId;

pub const DEFAULT_LIMIT: usize = 200;

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub label: String,
    pub changes: Vec<CellChange>,
}

impl HistoryEntry {
    pub fn new(label: impl Into<String>, changes: Vec<CellChange>) -> Self {
        Self {
            label: label.into(),
            changes,
        }
    }

    pub fn touched(&self) -> Vec<CellId> {
        let mut ids = Vec::new();
        for change in &self.changes {
            if !ids.contains(&change.id()) {
                ids.push(change.id());
            }
        }
        ids
    }

    /// Folds `change` in. A repeated update of one cell keeps the first
    /// `before` and takes the new `after`.
    fn absorb(&mut self, change: CellChange) {
        if let CellChange::Update { after, .. } = &change {
            let last_same = self.changes.iter_mut().rev().find(|c| c.id() == after.id());
            if let Some(CellChange::Update { after: slot, .. }) = last_same {
                *slot = after.clone();
                return;
            }
        }
        self.changes.push(change);
    }
}

#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    limit: usize,
    batch: Option<HistoryEntry>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
            batch: None,
        }
    }

    /// Records an already applied entry. Inside a batch the changes are
    /// folded into the batch instead.
    pub fn record(&mut self, entry: HistoryEntry) {
        if entry.changes.is_empty() {
            return;
        }
        if let Some(batch) = self.batch.as_mut() {
            for change in entry.changes {
                batch.absorb(change);
            }
            return;
        }
        self.push(entry);
    }

    fn push(&mut self, entry: HistoryEntry) {
        tracing::debug!(label = %entry.label, changes = entry.changes.len(), "history push");
        self.undo.push(entry);
        self.redo.clear();
        if self.undo.len() > self.limit {
            let overflow = self.undo.len() - self.limit;
            self.undo.drain(..overflow);
        }
    }

    /// Returns false when a batch is already open; the outer one keeps
    /// collecting.
    pub fn begin_batch(&mut self, label: impl Into<String>) -> bool {
        if self.batch.is_some() {
            return false;
        }
        self.batch = Some(HistoryEntry::new(label, Vec::new()));
        true
    }

    pub fn in_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Returns whether an entry was pushed.
    pub fn commit_batch(&mut self) -> bool {
        match self.batch.take() {
            Some(entry) if !entry.changes.is_empty() => {
                self.push(entry);
                true
            }
            _ => false,
        }
    }

    pub fn undo(&mut self, graph: &mut Graph) -> Option<&HistoryEntry> {
        let entry = self.undo.pop()?;
        graph.revert_all(&entry.changes);
        tracing::debug!(label = %entry.label, "undo");
        self.redo.push(entry);
        self.redo.last()
    }

    pub fn redo(&mut self, graph: &mut Graph) -> Option<&HistoryEntry> {
        let entry = self.redo.pop()?;
        graph.apply_all(&entry.changes);
        tracing::debug!(label = %entry.label, "redo");
        self.undo.push(entry);
        self.undo.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo.last().map(|e| e.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo.last().map(|e| e.label.as_str())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.batch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attrs, Cell, CellId, Node, Point, Size};

    fn node_at(id: u64, x: f32) -> Cell {
        Cell::Node(Node {
            id: CellId(id),
            shape: "rect".into(),
            position: Point::new(x, 0.0),
            size: Size::new(10.0, 10.0),
            z: 0,
            attrs: Attrs::new(),
            ports: Vec::new(),
        })
    }

    fn moved(graph: &mut Graph, id: u64, x: f32) -> HistoryEntry {
        let before = graph.get(CellId(id)).cloned().unwrap();
        let after = node_at(id, x);
        let change = CellChange::Update { before, after };
        graph.apply(&change);
        HistoryEntry::new("move", vec![change])
    }

    #[test]
    fn new_record_clears_redo() {
        let mut graph = Graph::from_cells(vec![node_at(1, 0.0)]);
        let mut history = History::new(10);
        history.record(moved(&mut graph, 1, 5.0));
        history.undo(&mut graph).unwrap();
        assert!(history.can_redo());
        history.record(moved(&mut graph, 1, 7.0));
        assert!(!history.can_redo());
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn limit_drops_oldest_entries() {
        let mut graph = Graph::from_cells(vec![node_at(1, 0.0)]);
        let mut history = History::new(3);
        for x in 1..=5 {
            history.record(moved(&mut graph, 1, x as f32));
        }
        assert_eq!(history.undo_depth(), 3);
        while history.undo(&mut graph).is_some() {}
        assert_eq!(graph.node(CellId(1)).unwrap().position.x, 2.0);
    }

    #[test]
    fn batch_coalesces_repeated_updates() {
        let mut graph = Graph::from_cells(vec![node_at(1, 0.0), node_at(2, 0.0)]);
        let mut history = History::default();
        assert!(history.begin_batch("drag"));
        assert!(!history.begin_batch("nested"));
        for x in 1..=4 {
            history.record(moved(&mut graph, 1, x as f32));
            history.record(moved(&mut graph, 2, -(x as f32)));
        }
        assert!(!history.can_undo());
        assert!(history.commit_batch());
        assert_eq!(history.undo_label(), Some("drag"));

        let entry = history.undo(&mut graph).unwrap();
        assert_eq!(entry.changes.len(), 2);
        assert_eq!(entry.touched(), vec![CellId(1), CellId(2)]);
        assert_eq!(graph.node(CellId(1)).unwrap().position.x, 0.0);
        assert_eq!(graph.node(CellId(2)).unwrap().position.x, 0.0);
        history.redo(&mut graph).unwrap();
        assert_eq!(graph.node(CellId(1)).unwrap().position.x, 4.0);
        assert_eq!(graph.node(CellId(2)).unwrap().position.x, -4.0);
    }

    #[test]
    fn empty_batch_pushes_nothing() {
        let mut history = History::default();
        history.begin_batch("click");
        assert!(!history.commit_batch());
        assert!(!history.can_undo());
    }
}
