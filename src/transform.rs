//! Geometry for interactive node transforms: resize handles and the
//! alignment guides shown while dragging.

use crate::model::{Point, RectF};

/// Smallest width or height a handle drag can produce.
pub const MIN_NODE_SIZE: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    NW,
    N,
    NE,
    W,
    E,
    SW,
    S,
    SE,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::N,
        ResizeHandle::NE,
        ResizeHandle::W,
        ResizeHandle::E,
        ResizeHandle::SW,
        ResizeHandle::S,
        ResizeHandle::SE,
    ];

    /// -1, 0 or 1 per axis, relative to the centre.
    pub fn direction(self) -> (f32, f32) {
        match self {
            ResizeHandle::NW => (-1.0, -1.0),
            ResizeHandle::N => (0.0, -1.0),
            ResizeHandle::NE => (1.0, -1.0),
            ResizeHandle::W => (-1.0, 0.0),
            ResizeHandle::E => (1.0, 0.0),
            ResizeHandle::SW => (-1.0, 1.0),
            ResizeHandle::S => (0.0, 1.0),
            ResizeHandle::SE => (1.0, 1.0),
        }
    }

    pub fn is_corner(self) -> bool {
        let (x, y) = self.direction();
        x != 0.0 && y != 0.0
    }

    pub fn position(self, rect: RectF) -> Point {
        let (sx, sy) = self.direction();
        let c = rect.center();
        Point::new(
            c.x + sx * rect.width() * 0.5,
            c.y + sy * rect.height() * 0.5,
        )
    }

    /// Bounds after dragging this handle by `delta` from `start`. The
    /// opposite side stays put. Corners keep the aspect ratio when
    /// `keep_ratio` is set.
    pub fn drag(self, start: RectF, delta: Point, keep_ratio: bool) -> RectF {
        let (sx, sy) = self.direction();
        let mut min = start.min;
        let mut max = start.max;
        if sx < 0.0 {
            min.x = (min.x + delta.x).min(max.x - MIN_NODE_SIZE);
        } else if sx > 0.0 {
            max.x = (max.x + delta.x).max(min.x + MIN_NODE_SIZE);
        }
        if sy < 0.0 {
            min.y = (min.y + delta.y).min(max.y - MIN_NODE_SIZE);
        } else if sy > 0.0 {
            max.y = (max.y + delta.y).max(min.y + MIN_NODE_SIZE);
        }

        if keep_ratio && self.is_corner() && start.width() > 0.0 && start.height() > 0.0 {
            let ratio = start.width() / start.height();
            let mut w = max.x - min.x;
            let mut h = max.y - min.y;
            if w / h > ratio {
                w = h * ratio;
            } else {
                h = w / ratio;
            }
            if w < MIN_NODE_SIZE || h < MIN_NODE_SIZE {
                let scale = (MIN_NODE_SIZE / w).max(MIN_NODE_SIZE / h);
                w *= scale;
                h *= scale;
            }
            if sx < 0.0 {
                min.x = max.x - w;
            } else {
                max.x = min.x + w;
            }
            if sy < 0.0 {
                min.y = max.y - h;
            } else {
                max.y = min.y + h;
            }
        }
        RectF { min, max }
    }
}

/// A line drawn across aligned nodes while dragging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Guide {
    Vertical { x: f32, from: f32, to: f32 },
    Horizontal { y: f32, from: f32, to: f32 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snap {
    /// The drag delta after snapping.
    pub delta: Point,
    pub guides: Vec<Guide>,
}

fn xs(r: RectF) -> [f32; 3] {
    [r.min.x, r.center().x, r.max.x]
}

fn ys(r: RectF) -> [f32; 3] {
    [r.min.y, r.center().y, r.max.y]
}

/// Closest alignment within `tolerance`, as (correction, line).
fn nearest(mine: [f32; 3], theirs: impl Iterator<Item = [f32; 3]>, tolerance: f32) -> Option<(f32, f32)> {
    let mut best: Option<(f32, f32)> = None;
    for lines in theirs {
        for line in lines {
            for own in mine {
                let d = line - own;
                if d.abs() <= tolerance && best.is_none_or(|(b, _)| d.abs() < b.abs()) {
                    best = Some((d, line));
                }
            }
        }
    }
    best
}

/// Adjusts `delta` so that `moving` lines up with an edge or centre of one
/// of `others`, independently per axis, and reports the guides to draw.
pub fn snap_to_neighbours(moving: RectF, delta: Point, others: &[RectF], tolerance: f32) -> Snap {
    let proposed = RectF {
        min: moving.min.translate(delta),
        max: moving.max.translate(delta),
    };
    let dx = nearest(xs(proposed), others.iter().copied().map(xs), tolerance);
    let dy = nearest(ys(proposed), others.iter().copied().map(ys), tolerance);
    let delta = Point::new(
        delta.x + dx.map_or(0.0, |(d, _)| d),
        delta.y + dy.map_or(0.0, |(d, _)| d),
    );
    let placed = RectF {
        min: moving.min.translate(delta),
        max: moving.max.translate(delta),
    };

    let on_line = |values: [f32; 3], line: f32| values.iter().any(|v| (v - line).abs() < 0.01);
    let mut guides = Vec::new();
    if let Some((_, x)) = dx {
        let (from, to) = others
            .iter()
            .filter(|r| on_line(xs(**r), x))
            .fold((placed.min.y, placed.max.y), |(a, b), r| (a.min(r.min.y), b.max(r.max.y)));
        guides.push(Guide::Vertical { x, from, to });
    }
    if let Some((_, y)) = dy {
        let (from, to) = others
            .iter()
            .filter(|r| on_line(ys(**r), y))
            .fold((placed.min.x, placed.max.x), |(a, b), r| (a.min(r.min.x), b.max(r.max.x)));
        guides.push(Guide::Horizontal { y, from, to });
    }
    Snap { delta, guides }
}

/// Smallest rectangle around all of `rects`.
pub fn union(rects: impl IntoIterator<Item = RectF>) -> Option<RectF> {
    rects.into_iter().reduce(|a, b| RectF {
        min: Point::new(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
        max: Point::new(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
    })
}
