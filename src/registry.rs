//! Shape templates and their inheritance chains.
//!
//! A template names an optional parent. Resolution walks the chain from the
//! root ancestor down to the requested name, merging each level on top of
//! the previous one, so a child only has to spell out what it changes.

use crate::error::ShapeError;
use crate::model::{AttrValue, Attrs, Port, PortSide, Size};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

pub const DEFAULT_SIZE: Size = Size::new(100.0, 40.0);

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PortGroupDef {
    #[serde(default)]
    pub side: Option<PortSide>,
    #[serde(default)]
    pub attrs: Attrs,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PortItem {
    pub id: String,
    pub group: String,
    #[serde(default)]
    pub attrs: Attrs,
}

impl PortItem {
    pub fn new(id: &str, group: &str) -> Self {
        Self {
            id: id.to_string(),
            group: group.to_string(),
            attrs: Attrs::new(),
        }
    }

    pub fn labelled(id: &str, group: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            group: group.to_string(),
            attrs: Attrs::new().with("text", "text", text),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ShapeTemplate {
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub port_groups: BTreeMap<String, PortGroupDef>,
    #[serde(default)]
    pub ports: Option<Vec<PortItem>>,
}

impl ShapeTemplate {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn inherit(parent: &str) -> Self {
        Self {
            parent: Some(parent.to_string()),
            ..Self::default()
        }
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn attr(mut self, group: &str, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.set(group, key, value);
        self
    }

    pub fn port_group(mut self, name: &str, side: Option<PortSide>, attrs: Attrs) -> Self {
        self.port_groups
            .insert(name.to_string(), PortGroupDef { side, attrs });
        self
    }

    pub fn ports(mut self, items: Vec<PortItem>) -> Self {
        self.ports = Some(items);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPortGroup {
    pub side: PortSide,
    pub attrs: Attrs,
}

/// A template with its whole chain folded in.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedShape {
    pub name: String,
    /// Root ancestor first, `name` last.
    pub chain: Vec<String>,
    pub size: Size,
    pub attrs: Attrs,
    pub port_groups: BTreeMap<String, ResolvedPortGroup>,
    pub ports: Vec<PortItem>,
}

impl ResolvedShape {
    /// The drawing primitive is the root of the chain.
    pub fn primitive(&self) -> &str {
        self.chain.first().map(String::as_str).unwrap_or(&self.name)
    }

    pub fn instantiate_ports(&self) -> Vec<Port> {
        self.ports
            .iter()
            .filter_map(|item| {
                let group = self.port_groups.get(&item.group)?;
                Some(Port {
                    id: item.id.clone(),
                    group: item.group.clone(),
                    side: group.side,
                    attrs: group.attrs.merged(&item.attrs),
                })
            })
            .collect()
    }
}

#[derive(Default)]
pub struct ShapeRegistry {
    templates: HashMap<String, ShapeTemplate>,
    cache: RefCell<HashMap<String, Rc<ResolvedShape>>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        template: ShapeTemplate,
        overwrite: bool,
    ) -> Result<(), ShapeError> {
        if self.templates.contains_key(name) && !overwrite {
            return Err(ShapeError::Duplicate(name.to_string()));
        }
        if let Some(parent) = &template.parent {
            if parent == name {
                return Err(ShapeError::Cycle {
                    name: name.to_string(),
                });
            }
            if !self.templates.contains_key(parent) {
                return Err(ShapeError::UnknownAncestor {
                    name: name.to_string(),
                    parent: parent.clone(),
                });
            }
            let mut current = Some(parent.clone());
            let mut steps = 0;
            while let Some(ancestor) = current {
                if ancestor == name || steps > self.templates.len() {
                    return Err(ShapeError::Cycle {
                        name: name.to_string(),
                    });
                }
                current = self
                    .templates
                    .get(&ancestor)
                    .and_then(|t| t.parent.clone());
                steps += 1;
            }
        }
        let replaced = self.templates.insert(name.to_string(), template).is_some();
        if replaced {
            self.cache
                .borrow_mut()
                .retain(|_, resolved| !resolved.chain.iter().any(|n| n == name));
        }
        tracing::debug!(shape = name, replaced, "registered shape template");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn template(&self, name: &str) -> Option<&ShapeTemplate> {
        self.templates.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Root ancestor first.
    pub fn chain(&self, name: &str) -> Result<Vec<String>, ShapeError> {
        let mut chain = Vec::new();
        let mut current = Some(name.to_string());
        while let Some(n) = current {
            let template = self.templates.get(&n).ok_or_else(|| {
                if chain.is_empty() {
                    ShapeError::UnknownShape(n.clone())
                } else {
                    ShapeError::UnknownAncestor {
                        name: chain.last().cloned().unwrap_or_default(),
                        parent: n.clone(),
                    }
                }
            })?;
            current = template.parent.clone();
            chain.push(n);
        }
        chain.reverse();
        Ok(chain)
    }

    pub fn resolve(&self, name: &str) -> Result<Rc<ResolvedShape>, ShapeError> {
        if let Some(hit) = self.cache.borrow().get(name) {
            return Ok(Rc::clone(hit));
        }
        let chain = self.chain(name)?;
        let mut size = None;
        let mut attrs = Attrs::new();
        let mut groups: BTreeMap<String, PortGroupDef> = BTreeMap::new();
        let mut ports: Option<&Vec<PortItem>> = None;
        for level in &chain {
            let Some(template) = self.templates.get(level) else {
                return Err(ShapeError::UnknownShape(level.clone()));
            };
            if template.size.is_some() {
                size = template.size;
            }
            attrs.merge(&template.attrs);
            for (group_name, def) in &template.port_groups {
                let slot = groups.entry(group_name.clone()).or_default();
                if def.side.is_some() {
                    slot.side = def.side;
                }
                slot.attrs.merge(&def.attrs);
            }
            if template.ports.is_some() {
                ports = template.ports.as_ref();
            }
        }
        let ports = ports.cloned().unwrap_or_default();
        for item in &ports {
            if !groups.contains_key(&item.group) {
                return Err(ShapeError::UnknownPortGroup {
                    shape: name.to_string(),
                    port: item.id.clone(),
                    group: item.group.clone(),
                });
            }
        }
        let resolved = Rc::new(ResolvedShape {
            name: name.to_string(),
            chain,
            size: size.unwrap_or(DEFAULT_SIZE),
            attrs,
            port_groups: groups
                .into_iter()
                .map(|(k, def)| {
                    (
                        k,
                        ResolvedPortGroup {
                            side: def.side.unwrap_or_default(),
                            attrs: def.attrs,
                        },
                    )
                })
                .collect(),
            ports,
        });
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&resolved));
        Ok(resolved)
    }

    /// Falls back to `rect` for names this registry does not know, which
    /// happens for documents saved by an editor with other templates.
    pub fn primitive_of(&self, name: &str) -> String {
        self.chain(name)
            .ok()
            .and_then(|c| c.into_iter().next())
            .unwrap_or_else(|| "rect".to_string())
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, template) in builtin_templates() {
            if let Err(err) = registry.register(name, template, true) {
                tracing::warn!(shape = name, %err, "builtin shape rejected");
            }
        }
        registry
    }
}

fn magnet(stroke: Option<&str>) -> Attrs {
    let attrs = Attrs::new()
        .with("circle", "r", 4)
        .with("circle", "magnet", true)
        .with("circle", "fill", "#fff")
        .with("circle", "strokeWidth", 1);
    match stroke {
        Some(s) => attrs.with("circle", "stroke", s),
        None => attrs,
    }
}

fn flowchart_ports(t: ShapeTemplate) -> ShapeTemplate {
    t.port_group("top", Some(PortSide::Top), magnet(Some("#5F95FF")))
        .port_group("right", Some(PortSide::Right), magnet(Some("#5F95FF")))
        .port_group("bottom", Some(PortSide::Bottom), magnet(Some("#5F95FF")))
        .port_group("left", Some(PortSide::Left), magnet(Some("#5F95FF")))
        .ports(vec![
            PortItem::new("top", "top"),
            PortItem::new("right", "right"),
            PortItem::new("bottom", "bottom"),
            PortItem::new("left", "left"),
        ])
}

fn flowchart_style(t: ShapeTemplate) -> ShapeTemplate {
    t.attr("body", "strokeWidth", 1)
        .attr("body", "stroke", "#5F95FF")
        .attr("body", "fill", "#EFF4FF")
        .attr("text", "fontSize", 12)
        .attr("text", "fill", "#262626")
}

fn primitive() -> ShapeTemplate {
    ShapeTemplate::root()
        .attr("body", "fill", "#ffffff")
        .attr("body", "stroke", "#333333")
        .attr("body", "strokeWidth", 2)
        .attr("text", "fontSize", 14)
        .attr("text", "fill", "#000000")
}

fn function_in_out(stroke: &str) -> ShapeTemplate {
    ShapeTemplate::inherit("base-node")
        .attr("body", "stroke", stroke)
        .port_group("in", None, Attrs::new().with("circle", "stroke", stroke))
        .port_group("out", None, Attrs::new().with("circle", "stroke", stroke))
}

/// Order matters: parents come before their children.
fn builtin_templates() -> Vec<(&'static str, ShapeTemplate)> {
    vec![
        ("rect", primitive().size(100.0, 40.0)),
        (
            "polygon",
            primitive()
                .size(100.0, 40.0)
                .attr("body", "refPoints", "0,0 10,0 10,10 0,10"),
        ),
        ("circle", primitive().size(60.0, 60.0)),
        (
            "custom-rect",
            flowchart_ports(flowchart_style(ShapeTemplate::inherit("rect").size(66.0, 36.0))),
        ),
        (
            "custom-polygon",
            flowchart_ports(flowchart_style(
                ShapeTemplate::inherit("polygon").size(66.0, 36.0),
            )),
        ),
        (
            "custom-circle",
            flowchart_ports(flowchart_style(ShapeTemplate::inherit("circle").size(45.0, 45.0))),
        ),
        (
            "flow-decision",
            ShapeTemplate::inherit("custom-polygon")
                .attr("body", "refPoints", "0,10 10,0 20,10 10,20"),
        ),
        (
            "flow-data",
            ShapeTemplate::inherit("custom-polygon")
                .attr("body", "refPoints", "10,0 40,0 30,20 0,20"),
        ),
        (
            "default-node",
            ShapeTemplate::inherit("custom-rect").attr("text", "text", "Node"),
        ),
        (
            "base-node",
            ShapeTemplate::inherit("rect")
                .size(180.0, 80.0)
                .attr("body", "fill", "#fff")
                .attr("body", "strokeWidth", 1)
                .attr("body", "rx", 4)
                .attr("body", "ry", 4)
                .attr("text", "fill", "#333")
                .attr("text", "fontSize", 14)
                .attr("text", "fontWeight", "bold")
                .port_group("in", Some(PortSide::Left), magnet(None))
                .port_group("out", Some(PortSide::Right), magnet(None)),
        ),
        (
            "function-node",
            function_in_out("#5F95FF")
                .size(180.0, 80.0)
                .attr("text", "text", "Function")
                .ports(vec![
                    PortItem::labelled("condition", "in", "Condition"),
                    PortItem::labelled("logic", "in", "Logic"),
                    PortItem::labelled("format", "in", "Output format"),
                    PortItem::labelled("out", "out", "Output"),
                ]),
        ),
        (
            "condition-node",
            function_in_out("#FF9966")
                .size(180.0, 100.0)
                .attr("text", "text", "Condition")
                .ports(vec![
                    PortItem::labelled("in", "in", "Input"),
                    PortItem::labelled("out1", "out", "Output 1"),
                    PortItem::labelled("out2", "out", "Output 2"),
                ]),
        ),
        (
            "logic-node",
            function_in_out("#5F95FF")
                .size(180.0, 130.0)
                .attr("text", "text", "Logic")
                .ports(vec![
                    PortItem::labelled("in", "in", "Input"),
                    PortItem::labelled("out", "out", "Output"),
                ]),
        ),
    ]
}
