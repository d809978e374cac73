//! Palette entries and their conversion into real nodes.
//!
//! A palette entry travels as a [`MarkerNode`] while it is being dragged.
//! On drop the marker's kind picks the template; the marker itself never
//! becomes part of the graph.

use crate::model::{Attrs, Size};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::{Deserialize, Serialize};

/// Fill colour palette markers are drawn with. Informational only: the
/// kind decides what gets created.
pub const MARKER_FILL: &str = "#fafafa";

pub const DEFAULT_NODE_SHAPE: &str = "default-node";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKind {
    Start,
    Process,
    Decision,
    Data,
    Prepare,
    Connector,
    Function,
    Condition,
    Logic,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 9] = [
        TemplateKind::Start,
        TemplateKind::Process,
        TemplateKind::Decision,
        TemplateKind::Data,
        TemplateKind::Prepare,
        TemplateKind::Connector,
        TemplateKind::Function,
        TemplateKind::Condition,
        TemplateKind::Logic,
    ];

    pub fn shape(self) -> &'static str {
        match self {
            TemplateKind::Start | TemplateKind::Process => "custom-rect",
            TemplateKind::Decision => "flow-decision",
            TemplateKind::Data => "flow-data",
            TemplateKind::Prepare | TemplateKind::Connector => "custom-circle",
            TemplateKind::Function => "function-node",
            TemplateKind::Condition => "condition-node",
            TemplateKind::Logic => "logic-node",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::Start => "Start",
            TemplateKind::Process => "Process",
            TemplateKind::Decision => "Decision",
            TemplateKind::Data => "Data",
            TemplateKind::Prepare => "Prepare",
            TemplateKind::Connector => "Connector",
            TemplateKind::Function => "Function",
            TemplateKind::Condition => "Condition",
            TemplateKind::Logic => "Logic",
        }
    }

    /// Attributes layered over the template when a node of this kind is
    /// created.
    pub fn overrides(self) -> Attrs {
        let attrs = Attrs::new().with("text", "text", self.name());
        match self {
            TemplateKind::Start => attrs.with("body", "rx", 20).with("body", "ry", 26),
            _ => attrs,
        }
    }

    fn search_terms(self) -> &'static str {
        match self {
            TemplateKind::Start => "start begin terminal",
            TemplateKind::Process => "process step action",
            TemplateKind::Decision => "decision branch diamond",
            TemplateKind::Data => "data input output parallelogram",
            TemplateKind::Prepare => "prepare setup",
            TemplateKind::Connector => "connector link circle",
            TemplateKind::Function => "function node",
            TemplateKind::Condition => "condition node if",
            TemplateKind::Logic => "logic node rule",
        }
    }
}

/// Transient drag payload for a palette entry.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerNode {
    pub kind: Option<TemplateKind>,
    pub label: String,
    pub size: Size,
    pub fill: String,
}

impl MarkerNode {
    pub fn tagged(kind: TemplateKind) -> Self {
        Self {
            kind: Some(kind),
            label: kind.name().to_string(),
            size: Size::new(160.0, 32.0),
            fill: MARKER_FILL.to_string(),
        }
    }

    pub fn untagged(label: impl Into<String>) -> Self {
        Self {
            kind: None,
            label: label.into(),
            size: Size::new(160.0, 32.0),
            fill: MARKER_FILL.to_string(),
        }
    }

    /// The explicit tag, or a label match when exactly one kind's name
    /// appears in the label.
    pub fn resolve_kind(&self) -> Option<TemplateKind> {
        if self.kind.is_some() {
            return self.kind;
        }
        let label = self.label.to_lowercase();
        let mut hits = TemplateKind::ALL
            .iter()
            .filter(|k| label.contains(&k.name().to_lowercase()));
        match (hits.next(), hits.next()) {
            (Some(kind), None) => Some(*kind),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StencilEntry {
    pub kind: TemplateKind,
    pub title: String,
    pub size: Size,
}

impl StencilEntry {
    fn new(kind: TemplateKind, width: f32, height: f32) -> Self {
        Self {
            kind,
            title: kind.name().to_string(),
            size: Size::new(width, height),
        }
    }

    pub fn marker(&self) -> MarkerNode {
        MarkerNode {
            size: self.size,
            ..MarkerNode::tagged(self.kind)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StencilGroup {
    pub name: String,
    pub title: String,
    pub entries: Vec<StencilEntry>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stencil {
    groups: Vec<StencilGroup>,
}

impl Stencil {
    pub fn flowchart() -> Self {
        Self {
            groups: vec![StencilGroup {
                name: "basic".into(),
                title: "Flowchart".into(),
                entries: vec![
                    StencilEntry::new(TemplateKind::Start, 66.0, 36.0),
                    StencilEntry::new(TemplateKind::Process, 66.0, 36.0),
                    StencilEntry::new(TemplateKind::Decision, 66.0, 36.0),
                    StencilEntry::new(TemplateKind::Data, 66.0, 36.0),
                    StencilEntry::new(TemplateKind::Prepare, 45.0, 45.0),
                    StencilEntry::new(TemplateKind::Connector, 45.0, 45.0),
                ],
            }],
        }
    }

    pub fn functions() -> Self {
        Self {
            groups: vec![StencilGroup {
                name: "function".into(),
                title: "Node types".into(),
                entries: vec![
                    StencilEntry::new(TemplateKind::Function, 160.0, 32.0),
                    StencilEntry::new(TemplateKind::Condition, 160.0, 32.0),
                    StencilEntry::new(TemplateKind::Logic, 160.0, 32.0),
                ],
            }],
        }
    }

    pub fn groups(&self) -> &[StencilGroup] {
        &self.groups
    }

    pub fn entries(&self) -> impl Iterator<Item = &StencilEntry> {
        self.groups.iter().flat_map(|g| g.entries.iter())
    }

    /// Entries matching `query`, best first. An empty query keeps palette
    /// order.
    pub fn search(&self, query: &str) -> Vec<&StencilEntry> {
        let q = query.trim();
        if q.is_empty() {
            return self.entries().collect();
        }
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(&StencilEntry, i64)> = self
            .entries()
            .filter_map(|e| {
                let haystack = format!("{} {}", e.title, e.kind.search_terms());
                matcher.fuzzy_match(&haystack, q).map(|score| (e, score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.title.cmp(&b.0.title)));
        scored.into_iter().map(|(e, _)| e).collect()
    }
}
