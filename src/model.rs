use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn translate(self, delta: Point) -> Self {
        self.offset(delta.x, delta.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RectF {
    pub min: Point,
    pub max: Point,
}

impl RectF {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self {
            min: origin,
            max: origin.offset(size.width, size.height),
        }
    }

    pub fn width(self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(self) -> Point {
        Point::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    pub fn contains(self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(self, other: RectF) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn expand(self, amount: f32) -> Self {
        Self {
            min: self.min.offset(-amount, -amount),
            max: self.max.offset(amount, amount),
        }
    }

    pub fn is_valid(self) -> bool {
        self.max.x > self.min.x && self.max.y > self.min.y
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub u64);

/// Largest id a document may carry. Ids above it do not survive a JSON
/// round trip through readers that use doubles.
pub const MAX_CELL_ID: u64 = (1 << 53) - 1;

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single style or content value inside an attribute group.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<f32> for AttrValue {
    fn from(value: f32) -> Self {
        AttrValue::Number(f64::from(value))
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Number(f64::from(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

pub type AttrGroup = BTreeMap<String, AttrValue>;

/// Named attribute groups (`body`, `text`, `line`, `label`, ...).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Attrs(BTreeMap<String, AttrGroup>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, group: &str, key: &str, value: impl Into<AttrValue>) -> Self {
        self.set(group, key, value);
        self
    }

    pub fn set(&mut self, group: &str, key: &str, value: impl Into<AttrValue>) {
        self.0
            .entry(group.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&AttrValue> {
        self.0.get(group).and_then(|g| g.get(key))
    }

    pub fn text(&self, group: &str, key: &str) -> Option<&str> {
        self.get(group, key).and_then(AttrValue::as_str)
    }

    pub fn number(&self, group: &str, key: &str) -> Option<f64> {
        self.get(group, key).and_then(AttrValue::as_f64)
    }

    pub fn group(&self, name: &str) -> Option<&AttrGroup> {
        self.0.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &AttrGroup)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|g| g.is_empty())
    }

    /// Shallow merge per group: keys present in `other` win, everything else is kept.
    pub fn merge(&mut self, other: &Attrs) {
        for (name, group) in &other.0 {
            let target = self.0.entry(name.clone()).or_default();
            for (key, value) in group {
                target.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn merged(&self, other: &Attrs) -> Attrs {
        let mut out = self.clone();
        out.merge(other);
        out
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
}

impl PortSide {
    /// Unit vector pointing away from the node through this side.
    pub fn outward(self) -> Point {
        match self {
            PortSide::Left => Point::new(-1.0, 0.0),
            PortSide::Right => Point::new(1.0, 0.0),
            PortSide::Top => Point::new(0.0, -1.0),
            PortSide::Bottom => Point::new(0.0, 1.0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, PortSide::Left | PortSide::Right)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Port {
    pub id: String,
    pub group: String,
    pub side: PortSide,
    #[serde(default)]
    pub attrs: Attrs,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: CellId,
    pub shape: String,
    pub position: Point,
    pub size: Size,
    #[serde(default)]
    pub z: i32,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub ports: Vec<Port>,
}

impl Node {
    pub fn bounds(&self) -> RectF {
        RectF::from_origin_size(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    pub fn label(&self) -> &str {
        self.attrs.text("text", "text").unwrap_or("")
    }

    pub fn port(&self, id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Ports sharing a side are spread evenly along it.
    pub fn port_anchor(&self, id: &str) -> Option<Point> {
        let port = self.port(id)?;
        let siblings: Vec<&Port> = self.ports.iter().filter(|p| p.side == port.side).collect();
        let index = siblings.iter().position(|p| p.id == port.id)?;
        let t = (index as f32 + 1.0) / (siblings.len() as f32 + 1.0);
        let r = self.bounds();
        Some(match port.side {
            PortSide::Left => Point::new(r.min.x, r.min.y + r.height() * t),
            PortSide::Right => Point::new(r.max.x, r.min.y + r.height() * t),
            PortSide::Top => Point::new(r.min.x + r.width() * t, r.min.y),
            PortSide::Bottom => Point::new(r.min.x + r.width() * t, r.max.y),
        })
    }

    pub fn port_anchors(&self) -> Vec<(&Port, Point)> {
        self.ports
            .iter()
            .filter_map(|p| self.port_anchor(&p.id).map(|a| (p, a)))
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Endpoint {
    Port { node: CellId, port: String },
    Point { x: f32, y: f32 },
}

impl Endpoint {
    pub fn port(node: CellId, port: impl Into<String>) -> Self {
        Endpoint::Port {
            node,
            port: port.into(),
        }
    }

    pub fn point(p: Point) -> Self {
        Endpoint::Point { x: p.x, y: p.y }
    }

    pub fn node(&self) -> Option<CellId> {
        match self {
            Endpoint::Port { node, .. } => Some(*node),
            Endpoint::Point { .. } => None,
        }
    }

    pub fn with_node(&self, node: CellId) -> Self {
        match self {
            Endpoint::Port { port, .. } => Endpoint::port(node, port.clone()),
            Endpoint::Point { .. } => self.clone(),
        }
    }

    pub fn translated(&self, delta: Point) -> Self {
        match self {
            Endpoint::Point { x, y } => Endpoint::point(Point::new(*x, *y).translate(delta)),
            Endpoint::Port { .. } => self.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum RouteStyle {
    Straight,
    Orthogonal { radius: f32 },
    Smooth,
}

impl Default for RouteStyle {
    fn default() -> Self {
        RouteStyle::Orthogonal { radius: 8.0 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: CellId,
    pub source: Endpoint,
    pub target: Endpoint,
    #[serde(default)]
    pub route: RouteStyle,
    #[serde(default)]
    pub z: i32,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Edge {
    pub fn touches(&self, node: CellId) -> bool {
        self.source.node() == Some(node) || self.target.node() == Some(node)
    }

    pub fn label(&self) -> &str {
        self.attrs.text("label", "text").unwrap_or("")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Cell {
    Node(Node),
    Edge(Edge),
}

impl Cell {
    pub fn id(&self) -> CellId {
        match self {
            Cell::Node(n) => n.id,
            Cell::Edge(e) => e.id,
        }
    }

    pub fn z(&self) -> i32 {
        match self {
            Cell::Node(n) => n.z,
            Cell::Edge(e) => e.z,
        }
    }

    pub fn attrs(&self) -> &Attrs {
        match self {
            Cell::Node(n) => &n.attrs,
            Cell::Edge(e) => &e.attrs,
        }
    }

    pub fn attrs_mut(&mut self) -> &mut Attrs {
        match self {
            Cell::Node(n) => &mut n.attrs,
            Cell::Edge(e) => &mut e.attrs,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Cell::Node(n) => Some(n),
            Cell::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Cell::Edge(e) => Some(e),
            Cell::Node(_) => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Cell::Node(_))
    }
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let ab_len2 = abx * abx + aby * aby;
    if ab_len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p.x - a.x) * abx + (p.y - a.y) * aby) / ab_len2;
    let t = t.clamp(0.0, 1.0);
    p.distance(Point::new(a.x + abx * t, a.y + aby * t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with_ports(ports: &[(&str, PortSide)]) -> Node {
        Node {
            id: CellId(1),
            shape: "rect".into(),
            position: Point::new(0.0, 0.0),
            size: Size::new(100.0, 60.0),
            z: 0,
            attrs: Attrs::new(),
            ports: ports
                .iter()
                .map(|(id, side)| Port {
                    id: id.to_string(),
                    group: "g".into(),
                    side: *side,
                    attrs: Attrs::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn ports_on_one_side_are_spread_evenly() {
        let node = node_with_ports(&[
            ("a", PortSide::Left),
            ("b", PortSide::Left),
            ("c", PortSide::Right),
        ]);
        assert_eq!(node.port_anchor("a"), Some(Point::new(0.0, 20.0)));
        assert_eq!(node.port_anchor("b"), Some(Point::new(0.0, 40.0)));
        assert_eq!(node.port_anchor("c"), Some(Point::new(100.0, 30.0)));
        assert_eq!(node.port_anchor("missing"), None);
    }

    #[test]
    fn attrs_merge_keeps_unrelated_keys() {
        let mut base = Attrs::new()
            .with("body", "stroke", "#000")
            .with("body", "fill", "#fff")
            .with("text", "fontSize", 12);
        base.merge(&Attrs::new().with("body", "stroke", "#f00"));
        assert_eq!(base.text("body", "stroke"), Some("#f00"));
        assert_eq!(base.text("body", "fill"), Some("#fff"));
        assert_eq!(base.number("text", "fontSize"), Some(12.0));
    }

    #[test]
    fn cells_serialize_with_kind_tags() {
        let edge = Cell::Edge(Edge {
            id: CellId(7),
            source: Endpoint::port(CellId(1), "right"),
            target: Endpoint::point(Point::new(3.0, 4.0)),
            route: RouteStyle::Smooth,
            z: 0,
            attrs: Attrs::new().with("line", "stroke", "#A2B1C3"),
        });
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["kind"], "edge");
        assert_eq!(json["source"]["type"], "port");
        assert_eq!(json["target"]["type"], "point");
        assert_eq!(json["route"]["name"], "smooth");
        let back: Cell = serde_json::from_value(json).unwrap();
        assert_eq!(back, edge);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Point::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Point::new(13.0, 4.0), a, b), 5.0);
    }
}
