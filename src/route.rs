//! Edge path computation.
//!
//! Straight edges are a single line. Orthogonal edges leave and enter ports
//! along the port's outward normal and bend through a mid channel, with each
//! corner rounded by a quadratic arc. Smooth edges are one cubic curve.

use crate::model::{Point, PortSide, RouteStyle};

/// Minimum run from a port before the first bend (world units).
const STUB_LENGTH: f32 = 15.0;

/// Points closer than this are treated as the same point.
const MERGE_EPSILON: f32 = 0.01;

const CURVE_STEPS: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub point: Point,
    pub side: Option<PortSide>,
}

impl Anchor {
    pub fn free(point: Point) -> Self {
        Self { point, side: None }
    }

    pub fn on(point: Point, side: PortSide) -> Self {
        Self {
            point,
            side: Some(side),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    Line(Point),
    Quad { ctrl: Point, to: Point },
    Cubic { c1: Point, c2: Point, to: Point },
}

impl Segment {
    pub fn end(&self) -> Point {
        match *self {
            Segment::Line(to) | Segment::Quad { to, .. } | Segment::Cubic { to, .. } => to,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgePath {
    pub start: Point,
    pub segments: Vec<Segment>,
}

impl EdgePath {
    pub fn end(&self) -> Point {
        self.segments.last().map(Segment::end).unwrap_or(self.start)
    }

    /// Approximates curves with fixed subdivisions.
    pub fn flatten(&self) -> Vec<Point> {
        let mut out = vec![self.start];
        let mut cursor = self.start;
        for seg in &self.segments {
            match *seg {
                Segment::Line(to) => out.push(to),
                Segment::Quad { ctrl, to } => {
                    for i in 1..=CURVE_STEPS {
                        let t = i as f32 / CURVE_STEPS as f32;
                        out.push(quad_at(cursor, ctrl, to, t));
                    }
                }
                Segment::Cubic { c1, c2, to } => {
                    for i in 1..=CURVE_STEPS {
                        let t = i as f32 / CURVE_STEPS as f32;
                        out.push(cubic_at(cursor, c1, c2, to, t));
                    }
                }
            }
            cursor = seg.end();
        }
        out
    }

    pub fn length(&self) -> f32 {
        self.flatten().windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Point halfway along the path, where the label sits.
    pub fn midpoint(&self) -> Point {
        let points = self.flatten();
        let total: f32 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
        let mut remaining = total * 0.5;
        for w in points.windows(2) {
            let len = w[0].distance(w[1]);
            if len >= remaining && len > 0.0 {
                let t = remaining / len;
                return Point::new(
                    w[0].x + (w[1].x - w[0].x) * t,
                    w[0].y + (w[1].y - w[0].y) * t,
                );
            }
            remaining -= len;
        }
        self.start
    }

    /// The last two distinct points, for orienting the arrow head.
    pub fn tail(&self) -> (Point, Point) {
        let points = self.flatten();
        let tip = points.last().copied().unwrap_or(self.start);
        let from = points
            .iter()
            .rev()
            .find(|p| p.distance(tip) > MERGE_EPSILON)
            .copied()
            .unwrap_or(tip);
        (from, tip)
    }
}

pub fn route(style: RouteStyle, from: Anchor, to: Anchor) -> EdgePath {
    match style {
        RouteStyle::Straight => EdgePath {
            start: from.point,
            segments: vec![Segment::Line(to.point)],
        },
        RouteStyle::Orthogonal { radius } => rounded(&orthogonal_waypoints(from, to), radius),
        RouteStyle::Smooth => smooth(from, to),
    }
}

fn stub(anchor: Anchor) -> Point {
    match anchor.side {
        Some(side) => {
            let n = side.outward();
            anchor.point.offset(n.x * STUB_LENGTH, n.y * STUB_LENGTH)
        }
        None => anchor.point,
    }
}

/// Axis-aligned polyline from `from` to `to`, corners only.
pub fn orthogonal_waypoints(from: Anchor, to: Anchor) -> Vec<Point> {
    let a = stub(from);
    let b = stub(to);
    let horizontal = match (from.side, to.side) {
        (Some(side), _) => side.is_horizontal(),
        (None, Some(side)) => side.is_horizontal(),
        (None, None) => (b.x - a.x).abs() >= (b.y - a.y).abs(),
    };
    let mut points = vec![from.point, a];
    if horizontal {
        let mid_x = (a.x + b.x) * 0.5;
        points.push(Point::new(mid_x, a.y));
        points.push(Point::new(mid_x, b.y));
    } else {
        let mid_y = (a.y + b.y) * 0.5;
        points.push(Point::new(a.x, mid_y));
        points.push(Point::new(b.x, mid_y));
    }
    points.push(b);
    points.push(to.point);
    simplify(points)
}

/// Drops repeated points and the middle of collinear runs.
fn simplify(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_some_and(|last| last.distance(p) <= MERGE_EPSILON) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let same_x = (a.x - b.x).abs() <= MERGE_EPSILON && (b.x - p.x).abs() <= MERGE_EPSILON;
            let same_y = (a.y - b.y).abs() <= MERGE_EPSILON && (b.y - p.y).abs() <= MERGE_EPSILON;
            if same_x || same_y {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

fn rounded(points: &[Point], radius: f32) -> EdgePath {
    let start = points.first().copied().unwrap_or_default();
    let mut segments = Vec::with_capacity(points.len() * 2);
    for i in 1..points.len() {
        let corner = points[i];
        let Some(&next) = points.get(i + 1) else {
            segments.push(Segment::Line(corner));
            break;
        };
        let prev = points[i - 1];
        let len_in = prev.distance(corner);
        let len_out = corner.distance(next);
        let r = radius.min(len_in * 0.5).min(len_out * 0.5);
        if r <= MERGE_EPSILON {
            segments.push(Segment::Line(corner));
            continue;
        }
        let enter = toward(corner, prev, r);
        let exit = toward(corner, next, r);
        segments.push(Segment::Line(enter));
        segments.push(Segment::Quad {
            ctrl: corner,
            to: exit,
        });
    }
    EdgePath { start, segments }
}

fn smooth(from: Anchor, to: Anchor) -> EdgePath {
    let a = from.point;
    let b = to.point;
    let reach = (a.distance(b) * 0.5).max(20.0);
    let fallback = Point::new(if b.x >= a.x { 1.0 } else { -1.0 }, 0.0);
    let out_a = from.side.map(PortSide::outward).unwrap_or(fallback);
    let out_b = to
        .side
        .map(PortSide::outward)
        .unwrap_or(Point::new(-fallback.x, 0.0));
    EdgePath {
        start: a,
        segments: vec![Segment::Cubic {
            c1: a.offset(out_a.x * reach, out_a.y * reach),
            c2: b.offset(out_b.x * reach, out_b.y * reach),
            to: b,
        }],
    }
}

fn toward(from: Point, to: Point, distance: f32) -> Point {
    let len = from.distance(to);
    if len <= f32::EPSILON {
        return from;
    }
    let t = distance / len;
    Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
}

fn quad_at(p0: Point, p1: Point, p2: Point, t: f32) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * p0.x + 2.0 * u * t * p1.x + t * t * p2.x,
        u * u * p0.y + 2.0 * u * t * p1.y + t * t * p2.y,
    )
}

fn cubic_at(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let u = 1.0 - t;
    let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_aligned(points: &[Point]) -> bool {
        points
            .windows(2)
            .all(|w| (w[0].x - w[1].x).abs() < 1e-3 || (w[0].y - w[1].y).abs() < 1e-3)
    }

    #[test]
    fn straight_is_one_line() {
        let path = route(
            RouteStyle::Straight,
            Anchor::free(Point::new(0.0, 0.0)),
            Anchor::free(Point::new(30.0, 40.0)),
        );
        assert_eq!(path.segments, vec![Segment::Line(Point::new(30.0, 40.0))]);
        assert_eq!(path.length(), 50.0);
        assert_eq!(path.midpoint(), Point::new(15.0, 20.0));
    }

    #[test]
    fn orthogonal_waypoints_only_bend_at_right_angles() {
        let cases = [
            (PortSide::Right, PortSide::Left, Point::new(200.0, 80.0)),
            (PortSide::Right, PortSide::Left, Point::new(-100.0, -40.0)),
            (PortSide::Bottom, PortSide::Top, Point::new(60.0, 150.0)),
            (PortSide::Right, PortSide::Top, Point::new(120.0, 120.0)),
        ];
        for (out_side, in_side, target) in cases {
            let pts = orthogonal_waypoints(
                Anchor::on(Point::new(0.0, 0.0), out_side),
                Anchor::on(target, in_side),
            );
            assert!(axis_aligned(&pts), "{out_side:?}->{in_side:?}: {pts:?}");
            assert_eq!(pts.first(), Some(&Point::new(0.0, 0.0)));
            assert_eq!(pts.last(), Some(&target));
        }
    }

    #[test]
    fn aligned_ports_route_straight_across() {
        let pts = orthogonal_waypoints(
            Anchor::on(Point::new(0.0, 10.0), PortSide::Right),
            Anchor::on(Point::new(100.0, 10.0), PortSide::Left),
        );
        assert_eq!(pts, vec![Point::new(0.0, 10.0), Point::new(100.0, 10.0)]);
    }

    #[test]
    fn corners_are_rounded_with_bounded_radius() {
        let path = route(
            RouteStyle::Orthogonal { radius: 8.0 },
            Anchor::on(Point::new(0.0, 0.0), PortSide::Right),
            Anchor::on(Point::new(100.0, 100.0), PortSide::Left),
        );
        let quads: Vec<_> = path
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Quad { .. }))
            .collect();
        assert_eq!(quads.len(), 2);
        if let Segment::Quad { ctrl, to } = quads[0] {
            assert!((ctrl.distance(*to) - 8.0).abs() < 1e-3);
        }
        assert_eq!(path.end(), Point::new(100.0, 100.0));
    }

    #[test]
    fn smooth_leaves_along_port_normal() {
        let path = route(
            RouteStyle::Smooth,
            Anchor::on(Point::new(0.0, 0.0), PortSide::Bottom),
            Anchor::on(Point::new(0.0, 100.0), PortSide::Top),
        );
        match path.segments[0] {
            Segment::Cubic { c1, c2, to } => {
                assert_eq!(c1, Point::new(0.0, 50.0));
                assert_eq!(c2, Point::new(0.0, 50.0));
                assert_eq!(to, Point::new(0.0, 100.0));
            }
            other => panic!("unexpected segment {other:?}"),
        }
        let (from, tip) = path.tail();
        assert!(from.y < tip.y);
    }
}
