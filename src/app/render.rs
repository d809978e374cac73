use eframe::egui;
use sanflow::Editor;
use sanflow::model::{Edge, Node, Point, RectF};
use sanflow::stencil::{MARKER_FILL, MarkerNode, StencilEntry};
use sanflow::transform::{Guide, ResizeHandle};

use super::interaction::InProgress;
use super::{View, parse_color};

const DEFAULT_STROKE: egui::Color32 = egui::Color32::from_rgb(0x5F, 0x95, 0xFF);
const DEFAULT_FILL: egui::Color32 = egui::Color32::from_rgb(0xEF, 0xF4, 0xFF);
const DEFAULT_TEXT: egui::Color32 = egui::Color32::from_rgb(0x26, 0x26, 0x26);
const DEFAULT_LINE: egui::Color32 = egui::Color32::from_rgb(0xA2, 0xB1, 0xC3);
const SELECTED: egui::Color32 = egui::Color32::from_rgb(0xFF, 0x99, 0x33);
const GUIDE: egui::Color32 = egui::Color32::from_rgb(0xFA, 0x52, 0x7F);

pub(super) fn draw_background(painter: &egui::Painter, rect: egui::Rect, view: &View) {
    painter.rect_filled(rect, 0.0, egui::Color32::from_gray(250));
    let grid_color = egui::Color32::from_gray(225);
    let spacing_screen = 20.0 * view.zoom;
    if spacing_screen < 8.0 {
        return;
    }
    let start = rect.min + view.pan_screen;
    let x0 = ((rect.min.x - start.x) / spacing_screen).floor() * spacing_screen + start.x;
    let y0 = ((rect.min.y - start.y) / spacing_screen).floor() * spacing_screen + start.y;
    let mut x = x0;
    while x < rect.max.x {
        painter.line_segment(
            [egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)],
            egui::Stroke::new(1.0, grid_color),
        );
        x += spacing_screen;
    }
    let mut y = y0;
    while y < rect.max.y {
        painter.line_segment(
            [egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)],
            egui::Stroke::new(1.0, grid_color),
        );
        y += spacing_screen;
    }
}

/// Edges under nodes, then nodes by z, then ports on top.
pub(super) fn draw_graph(painter: &egui::Painter, origin: egui::Pos2, view: &View, editor: &Editor) {
    let graph = editor.graph();
    let selection = editor.selection();
    for edge in graph.edges() {
        draw_edge(painter, origin, view, editor, edge, selection.contains(edge.id));
    }
    let mut nodes: Vec<&Node> = graph.nodes().collect();
    nodes.sort_by_key(|n| n.z);
    for node in &nodes {
        draw_node(painter, origin, view, editor, node, selection.contains(node.id));
    }
    if editor.ports_visible() {
        for node in &nodes {
            draw_ports(painter, origin, view, node);
        }
    }
}

fn screen_rect(origin: egui::Pos2, view: &View, r: RectF) -> egui::Rect {
    egui::Rect::from_min_max(
        view.world_to_screen(origin, r.min),
        view.world_to_screen(origin, r.max),
    )
}

fn draw_node(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    editor: &Editor,
    node: &Node,
    selected: bool,
) {
    let attrs = &node.attrs;
    let fill = parse_color(attrs.text("body", "fill"), DEFAULT_FILL);
    let stroke_color = parse_color(attrs.text("body", "stroke"), DEFAULT_STROKE);
    let stroke_width = attrs.number("body", "strokeWidth").unwrap_or(1.0) as f32;
    let stroke = egui::Stroke::new(stroke_width * view.zoom, stroke_color);
    let rect = screen_rect(origin, view, node.bounds());

    match editor.registry().primitive_of(&node.shape).as_str() {
        "circle" => {
            let radius = rect.width().min(rect.height()) * 0.5;
            painter.circle(rect.center(), radius, fill, stroke);
        }
        "polygon" => {
            let points = ref_points(attrs.text("body", "refPoints"), rect);
            if points.len() >= 3 {
                painter.add(egui::Shape::convex_polygon(points, fill, stroke));
            } else {
                painter.rect_filled(rect, 0.0, fill);
                painter.rect_stroke(rect, 0.0, stroke, egui::StrokeKind::Middle);
            }
        }
        _ => {
            let rx = attrs.number("body", "rx").unwrap_or(0.0) as f32 * view.zoom;
            let radius = rx.min(rect.height() * 0.5).min(u8::MAX as f32) as u8;
            painter.rect_filled(rect, radius, fill);
            painter.rect_stroke(rect, radius, stroke, egui::StrokeKind::Middle);
        }
    }

    let label = node.label();
    if !label.is_empty() {
        let font_size = attrs.number("text", "fontSize").unwrap_or(12.0) as f32;
        let color = parse_color(attrs.text("text", "fill"), DEFAULT_TEXT);
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            label,
            egui::FontId::proportional(font_size * view.zoom),
            color,
        );
    }

    if selected {
        painter.rect_stroke(
            rect.expand(3.0),
            2.0,
            egui::Stroke::new(1.5, SELECTED),
            egui::StrokeKind::Middle,
        );
    }
}

/// Scales a `refPoints` string ("x,y x,y ...") into `rect`.
fn ref_points(points: Option<&str>, rect: egui::Rect) -> Vec<egui::Pos2> {
    let raw: Vec<(f32, f32)> = points
        .unwrap_or("")
        .split_whitespace()
        .filter_map(|pair| {
            let (x, y) = pair.split_once(',')?;
            Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
        })
        .collect();
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for (x, y) in &raw {
        min_x = min_x.min(*x);
        min_y = min_y.min(*y);
        max_x = max_x.max(*x);
        max_y = max_y.max(*y);
    }
    let w = (max_x - min_x).max(f32::EPSILON);
    let h = (max_y - min_y).max(f32::EPSILON);
    raw.into_iter()
        .map(|(x, y)| {
            egui::pos2(
                rect.min.x + (x - min_x) / w * rect.width(),
                rect.min.y + (y - min_y) / h * rect.height(),
            )
        })
        .collect()
}

fn draw_edge(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    editor: &Editor,
    edge: &Edge,
    selected: bool,
) {
    let Some(path) = editor.graph().edge_path(edge) else {
        return;
    };
    let attrs = &edge.attrs;
    let color = if selected {
        SELECTED
    } else {
        parse_color(attrs.text("line", "stroke"), DEFAULT_LINE)
    };
    let width = attrs.number("line", "strokeWidth").unwrap_or(1.0) as f32;
    let stroke = egui::Stroke::new(width * view.zoom.max(0.5), color);
    let points: Vec<egui::Pos2> = path
        .flatten()
        .into_iter()
        .map(|p| view.world_to_screen(origin, p))
        .collect();
    painter.add(egui::Shape::line(points, stroke));

    if attrs.text("line", "targetMarker").is_some() {
        let (from, tip) = path.tail();
        draw_arrowhead(
            painter,
            view.world_to_screen(origin, from),
            view.world_to_screen(origin, tip),
            stroke,
            view.zoom,
        );
    }

    let label = edge.label();
    if !label.is_empty() {
        let at = view.world_to_screen(origin, path.midpoint());
        let galley = painter.layout_no_wrap(
            label.to_string(),
            egui::FontId::proportional(12.0 * view.zoom),
            DEFAULT_TEXT,
        );
        let bg = egui::Rect::from_center_size(at, galley.size()).expand(2.0);
        painter.rect_filled(bg, 2.0, egui::Color32::WHITE);
        painter.galley(bg.min + egui::vec2(2.0, 2.0), galley, DEFAULT_TEXT);
    }
}

fn draw_ports(painter: &egui::Painter, origin: egui::Pos2, view: &View, node: &Node) {
    for (port, anchor) in node.port_anchors() {
        let at = view.world_to_screen(origin, anchor);
        let stroke = parse_color(port.attrs.text("circle", "stroke"), DEFAULT_STROKE);
        painter.circle(
            at,
            4.0 * view.zoom.max(0.75),
            egui::Color32::WHITE,
            egui::Stroke::new(1.0, stroke),
        );
        if let Some(text) = port.attrs.text("text", "text") {
            let outward = port.side.outward();
            let offset = egui::vec2(outward.x, outward.y) * -10.0 * view.zoom;
            let align = match (outward.x > 0.0, outward.x < 0.0) {
                (true, _) => egui::Align2::RIGHT_CENTER,
                (_, true) => egui::Align2::LEFT_CENTER,
                _ => egui::Align2::CENTER_CENTER,
            };
            painter.text(
                at + offset,
                align,
                text,
                egui::FontId::proportional(10.0 * view.zoom),
                DEFAULT_TEXT,
            );
        }
    }
}

pub(super) fn draw_in_progress(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    editor: &Editor,
    in_progress: Option<&InProgress>,
) {
    match in_progress {
        Some(InProgress::Connect { source, current }) => {
            let Some(anchor) = editor.graph().endpoint_anchor(source) else {
                return;
            };
            let snapped = editor.snap_endpoint(*current, None);
            let end = editor
                .graph()
                .endpoint_anchor(&snapped)
                .map(|a| a.point)
                .unwrap_or(*current);
            let stroke = egui::Stroke::new(1.5, DEFAULT_STROKE);
            let a = view.world_to_screen(origin, anchor.point);
            let b = view.world_to_screen(origin, end);
            painter.line_segment([a, b], stroke);
            draw_arrowhead(painter, a, b, stroke, view.zoom);
        }
        Some(InProgress::RubberBand { start, current }) => {
            let rect = screen_rect(origin, view, RectF::from_corners(*start, *current));
            painter.rect_filled(rect, 0.0, egui::Color32::from_rgba_unmultiplied(95, 149, 255, 30));
            painter.rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(1.0, DEFAULT_STROKE),
                egui::StrokeKind::Middle,
            );
        }
        Some(InProgress::DragNodes { guides, .. }) => {
            let stroke = egui::Stroke::new(1.0, GUIDE);
            for guide in guides {
                let (a, b) = match *guide {
                    Guide::Vertical { x, from, to } => (Point::new(x, from), Point::new(x, to)),
                    Guide::Horizontal { y, from, to } => (Point::new(from, y), Point::new(to, y)),
                };
                painter.line_segment(
                    [view.world_to_screen(origin, a), view.world_to_screen(origin, b)],
                    stroke,
                );
            }
        }
        Some(InProgress::Resize { .. }) | None => {}
    }
}

pub(super) fn draw_handles(painter: &egui::Painter, origin: egui::Pos2, view: &View, bounds: RectF) {
    let fill = egui::Color32::from_rgb(250, 250, 250);
    let stroke = egui::Stroke::new(1.0, egui::Color32::from_rgb(90, 160, 255));
    for handle in ResizeHandle::ALL {
        let at = view.world_to_screen(origin, handle.position(bounds));
        let r = egui::Rect::from_center_size(at, egui::vec2(8.0, 8.0));
        painter.rect_filled(r, 1.0, fill);
        painter.rect_stroke(r, 1.0, stroke, egui::StrokeKind::Middle);
    }
}

/// A stencil button. Dragging it starts a palette drag; returns whether it
/// was clicked instead.
pub(super) fn palette_entry(
    ui: &mut egui::Ui,
    entry: &StencilEntry,
    palette: &mut Option<MarkerNode>,
) -> bool {
    let fill = parse_color(Some(MARKER_FILL), egui::Color32::WHITE);
    let button = egui::Button::new(egui::RichText::new(entry.title.as_str()).color(DEFAULT_TEXT))
        .min_size(egui::vec2(entry.size.width, entry.size.height))
        .fill(fill)
        .sense(egui::Sense::click_and_drag());
    let response = ui.add(button).on_hover_text("Drag onto the canvas, or click to add");
    if response.drag_started() {
        *palette = Some(entry.marker());
    }
    response.clicked()
}

/// Palette entry as it looks while being dragged.
pub(super) fn draw_marker(painter: &egui::Painter, at: egui::Pos2, marker: &MarkerNode) {
    let rect = egui::Rect::from_center_size(at, egui::vec2(marker.size.width, marker.size.height));
    let fill = parse_color(Some(marker.fill.as_str()), parse_color(Some(MARKER_FILL), egui::Color32::WHITE));
    painter.rect_filled(rect, 4.0, fill);
    painter.rect_stroke(
        rect,
        4.0,
        egui::Stroke::new(1.0, egui::Color32::from_gray(180)),
        egui::StrokeKind::Middle,
    );
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        &marker.label,
        egui::FontId::proportional(12.0),
        DEFAULT_TEXT,
    );
}

fn draw_arrowhead(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    zoom: f32,
) {
    let v = b - a;
    if v.length_sq() <= f32::EPSILON {
        return;
    }
    let dir = v.normalized();
    let size = 8.0 * zoom.max(0.5);
    let perp = egui::vec2(-dir.y, dir.x);
    let base = b - dir * size;
    painter.add(egui::Shape::convex_polygon(
        vec![b, base + perp * (size * 0.5), base - perp * (size * 0.5)],
        stroke.color,
        egui::Stroke::NONE,
    ));
}
