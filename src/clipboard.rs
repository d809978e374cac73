//! Structural copy of a subgraph.

use crate::connection::ConnectionRules;
use crate::graph::{CellChange, Graph};
use crate::model::{Cell, CellId, Edge, Endpoint, Node, Point};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What happens to an edge with exactly one end inside the copied nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingEdges {
    #[default]
    Skip,
    /// Keep the edge and, on paste, rewire only the inside end.
    Reattach,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipboardBuffer {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub policy: CrossingEdges,
}

impl ClipboardBuffer {
    pub fn capture(graph: &Graph, ids: &[CellId], policy: CrossingEdges) -> Self {
        let nodes: Vec<Node> = graph
            .nodes()
            .filter(|n| ids.contains(&n.id))
            .cloned()
            .collect();
        let inside = |ep: &Endpoint| match ep.node() {
            Some(node) => nodes.iter().any(|n| n.id == node),
            None => true,
        };
        let edges = graph
            .edges()
            .filter(|e| {
                let (src, dst) = (inside(&e.source), inside(&e.target));
                let anchored = e.source.node().is_some() || e.target.node().is_some();
                if !anchored {
                    return ids.contains(&e.id);
                }
                match policy {
                    CrossingEdges::Skip => src && dst,
                    CrossingEdges::Reattach => {
                        [&e.source, &e.target]
                            .iter()
                            .any(|ep| ep.node().is_some() && inside(*ep))
                    }
                }
            })
            .cloned()
            .collect();
        Self {
            nodes,
            edges,
            policy,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.edges.len()
    }

    /// The same buffer without edges that point at nodes outside it. Used
    /// once the graph it was copied from is gone, since those ids may now
    /// name unrelated nodes.
    pub fn detached(&self) -> Self {
        let owned = |ep: &Endpoint| match ep.node() {
            Some(node) => self.nodes.iter().any(|n| n.id == node),
            None => true,
        };
        Self {
            nodes: self.nodes.clone(),
            edges: self
                .edges
                .iter()
                .filter(|e| owned(&e.source) && owned(&e.target))
                .cloned()
                .collect(),
            policy: self.policy,
        }
    }

    /// Fresh copies translated by `offset`, ready to insert. Edges that
    /// would not pass `rules` against the current graph are left out.
    pub fn materialize(&self, graph: &mut Graph, offset: Point, rules: &ConnectionRules) -> Vec<Cell> {
        let base_z = graph.next_z();
        let min_z = self.nodes.iter().map(|n| n.z).min().unwrap_or(0);
        let mut remap: HashMap<CellId, CellId> = HashMap::new();
        let mut cells = Vec::with_capacity(self.len());
        for node in &self.nodes {
            let id = graph.allocate_id();
            remap.insert(node.id, id);
            cells.push(Cell::Node(Node {
                id,
                position: node.position.translate(offset),
                z: base_z.saturating_add(node.z.saturating_sub(min_z)),
                ..node.clone()
            }));
        }

        let mut staged = graph.clone();
        for cell in &cells {
            staged.apply(&CellChange::Insert {
                index: staged.len(),
                cell: cell.clone(),
            });
        }

        let rewire = |ep: &Endpoint| match ep.node().and_then(|n| remap.get(&n)) {
            Some(fresh) => ep.with_node(*fresh),
            None => ep.translated(offset),
        };
        for edge in &self.edges {
            let source = rewire(&edge.source);
            let target = rewire(&edge.target);
            if let Err(err) = rules.validate(&staged, &source, &target) {
                tracing::warn!(edge = %edge.id, %err, "dropping clipboard edge");
                continue;
            }
            cells.push(Cell::Edge(Edge {
                id: graph.allocate_id(),
                source,
                target,
                ..edge.clone()
            }));
        }
        cells
    }
}
