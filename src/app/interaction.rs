use eframe::egui;
use sanflow::Editor;
use sanflow::config::EditorSettings;
use sanflow::model::{CellId, Endpoint, Point, RectF};
use sanflow::stencil::MarkerNode;
use sanflow::transform::{self, Guide, ResizeHandle, Snap};

use super::View;
use super::render::{draw_background, draw_graph, draw_handles, draw_in_progress};

/// Screen-space radius within which a resize handle grabs the pointer.
const HANDLE_GRAB: f32 = 6.0;

/// Pointer gesture between press and release.
#[derive(Clone, Debug)]
pub(super) enum InProgress {
    /// `applied` is the total offset already moved since `start`.
    DragNodes {
        start: Point,
        applied: Point,
        guides: Vec<Guide>,
    },
    Resize {
        id: CellId,
        handle: ResizeHandle,
        start_bounds: RectF,
        start: Point,
    },
    Connect { source: Endpoint, current: Point },
    RubberBand { start: Point, current: Point },
}

/// What the host needs to know about a frame of canvas input.
#[derive(Debug, Default)]
pub(super) struct CanvasOutcome {
    pub interacted: bool,
    pub clicked_node: Option<CellId>,
    pub status: Option<String>,
}

/// A pannable, zoomable view over one editor. The main window and the
/// function drawer each own one.
#[derive(Default)]
pub(super) struct Canvas {
    pub view: View,
    in_progress: Option<InProgress>,
    context_hit: Option<CellId>,
    rect: Option<egui::Rect>,
}

impl Canvas {
    pub fn zoom_step(&mut self, settings: &EditorSettings, direction: f32) {
        let zoom = settings.clamp_zoom(self.view.zoom + settings.zoom_step * direction);
        // rounding keeps repeated steps on the 0.1 grid
        let zoom = (zoom * 100.0).round() / 100.0;
        match self.rect {
            Some(rect) => self.view.zoom_about_screen_point(rect.min, rect.center(), zoom),
            None => self.view.zoom = zoom,
        }
    }

    pub fn reset_view(&mut self) {
        self.view = View::default();
    }

    /// Drops `marker` in the middle of the visible area.
    pub fn drop_at_center(&self, editor: &mut Editor, marker: &MarkerNode) -> Option<String> {
        let at = match self.rect {
            Some(rect) => self.view.screen_to_world(rect.min, rect.center()),
            None => Point::new(200.0, 150.0),
        };
        editor.drop_marker(marker, at).err().map(|e| format!("Drop failed: {e}"))
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        editor: &mut Editor,
        settings: &EditorSettings,
        palette: &Option<MarkerNode>,
    ) -> CanvasOutcome {
        let mut outcome = CanvasOutcome::default();
        let ctx = ui.ctx().clone();
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        self.rect = Some(rect);
        let origin = rect.min;

        let hover_pos = ctx.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));
        let scroll_delta = ctx.input(|i| i.raw_scroll_delta.y);
        if scroll_delta.abs() > 0.0 {
            if let Some(hover) = hover_pos {
                let factor = (1.0 + scroll_delta * 0.001).clamp(0.8, 1.25);
                let zoom = settings.clamp_zoom(self.view.zoom * factor);
                self.view.zoom_about_screen_point(origin, hover, zoom);
            }
        }
        if response.dragged_by(egui::PointerButton::Middle) {
            self.view.pan_screen += response.drag_delta();
        }

        let pointer_world = ctx
            .input(|i| i.pointer.interact_pos())
            .map(|p| self.view.screen_to_world(origin, p));
        let threshold_world = 6.0 / self.view.zoom;

        // palette drops land wherever the pointer was released
        if let Some(marker) = palette {
            let released = ctx.input(|i| i.pointer.any_released());
            if released {
                if let Some(hover) = hover_pos {
                    let at = self.view.screen_to_world(origin, hover);
                    match editor.drop_marker(marker, at) {
                        Ok(id) => outcome.status = Some(format!("Added {} {id}", marker.label)),
                        Err(err) => outcome.status = Some(format!("Drop failed: {err}")),
                    }
                    outcome.interacted = true;
                }
            }
        }

        let hovering_node = hover_pos.is_some()
            && pointer_world.is_some_and(|p| {
                editor.node_at(p).is_some() || editor.port_near(p, None).is_some()
            });
        let connecting = matches!(self.in_progress, Some(InProgress::Connect { .. }));
        editor.set_ports_visible(hovering_node || connecting);

        let shift = ctx.input(|i| i.modifiers.shift);
        let grab = HANDLE_GRAB / self.view.zoom;
        if let Some(p) = pointer_world.filter(|_| hover_pos.is_some()) {
            if let Some((_, handle)) = handle_at(editor, p, grab) {
                ctx.set_cursor_icon(cursor_for(handle));
            }
        }
        if response.drag_started_by(egui::PointerButton::Primary) {
            outcome.interacted = true;
            let press = ctx
                .input(|i| i.pointer.press_origin())
                .map(|p| self.view.screen_to_world(origin, p));
            if let Some(p) = press {
                self.in_progress = Some(self.begin_gesture(editor, p, shift, grab));
            }
        }

        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(p) = pointer_world {
                match &mut self.in_progress {
                    Some(InProgress::DragNodes {
                        start,
                        applied,
                        guides,
                    }) => {
                        let raw = Point::new(p.x - start.x, p.y - start.y);
                        let ids = editor.selected_nodes();
                        let snap = if settings.snapline {
                            snap_drag(editor, &ids, *applied, raw, settings.snapline_tolerance / self.view.zoom)
                        } else {
                            Snap {
                                delta: raw,
                                guides: Vec::new(),
                            }
                        };
                        let step = Point::new(snap.delta.x - applied.x, snap.delta.y - applied.y);
                        match editor.move_nodes(&ids, step) {
                            Ok(()) => {
                                *applied = snap.delta;
                                *guides = snap.guides;
                            }
                            Err(err) => outcome.status = Some(format!("Move failed: {err}")),
                        }
                    }
                    Some(InProgress::Resize {
                        id,
                        handle,
                        start_bounds,
                        start,
                    }) => {
                        let delta = Point::new(p.x - start.x, p.y - start.y);
                        let bounds = handle.drag(*start_bounds, delta, shift);
                        let resized = editor
                            .move_node(*id, bounds.min)
                            .and_then(|()| editor.resize(*id, bounds.width(), bounds.height()));
                        if let Err(err) = resized {
                            outcome.status = Some(format!("Resize failed: {err}"));
                        }
                    }
                    Some(InProgress::Connect { current, .. })
                    | Some(InProgress::RubberBand { current, .. }) => *current = p,
                    None => {}
                }
            }
        }

        if response.drag_stopped() {
            if let Some(done) = self.in_progress.take() {
                outcome.status = self.finish_gesture(editor, done, shift);
            }
        }

        if response.clicked() {
            outcome.interacted = true;
            if let Some(p) = pointer_world {
                let hit = editor
                    .node_at(p)
                    .or_else(|| editor.edge_near(p, threshold_world));
                match hit {
                    Some(id) if shift => editor.toggle(id),
                    Some(id) => {
                        editor.select(&[id]);
                        if editor.graph().node(id).is_some() {
                            outcome.clicked_node = Some(id);
                        }
                    }
                    None if !shift => editor.clear_selection(),
                    None => {}
                }
            }
        }

        if response.secondary_clicked() {
            outcome.interacted = true;
            self.context_hit = pointer_world.and_then(|p| {
                editor
                    .node_at(p)
                    .or_else(|| editor.edge_near(p, threshold_world))
            });
            if let Some(hit) = self.context_hit {
                if !editor.selection().contains(hit) {
                    editor.select(&[hit]);
                }
            }
        }

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, &self.view);
        draw_graph(&painter, origin, &self.view, editor);
        if let Some(node) = single_selected_node(editor) {
            draw_handles(&painter, origin, &self.view, node.bounds());
        }
        draw_in_progress(&painter, origin, &self.view, editor, self.in_progress.as_ref());

        let context_hit = self.context_hit;
        response.context_menu(|ui| {
            if let Some(status) = context_menu(ui, editor, context_hit) {
                outcome.status = Some(status);
            }
        });

        outcome
    }

    fn begin_gesture(&self, editor: &mut Editor, p: Point, shift: bool, grab: f32) -> InProgress {
        if let Some((id, handle)) = handle_at(editor, p, grab) {
            if let Some(node) = editor.graph().node(id) {
                let start_bounds = node.bounds();
                editor.begin_batch("resize");
                return InProgress::Resize {
                    id,
                    handle,
                    start_bounds,
                    start: p,
                };
            }
        }
        if let Some((node, port)) = editor.port_near(p, None) {
            return InProgress::Connect {
                source: Endpoint::port(node, port),
                current: p,
            };
        }
        if let Some(id) = editor.node_at(p) {
            if !editor.selection().contains(id) {
                if shift {
                    editor.toggle(id);
                } else {
                    editor.select(&[id]);
                }
            }
            editor.begin_batch("move");
            return InProgress::DragNodes {
                start: p,
                applied: Point::default(),
                guides: Vec::new(),
            };
        }
        InProgress::RubberBand { start: p, current: p }
    }

    fn finish_gesture(&self, editor: &mut Editor, done: InProgress, shift: bool) -> Option<String> {
        match done {
            InProgress::DragNodes { .. } | InProgress::Resize { .. } => {
                editor.commit_batch();
                None
            }
            InProgress::Connect { source, current } => {
                let target = editor.snap_endpoint(current, None);
                match editor.add_edge(source, target, None) {
                    Ok(id) => Some(format!("Connected {id}")),
                    Err(err) => Some(format!("Connection rejected: {err}")),
                }
            }
            InProgress::RubberBand { start, current } => {
                let mut ids = editor.nodes_in_rect(RectF::from_corners(start, current));
                if shift {
                    ids.splice(0..0, editor.selection().ids().iter().copied());
                }
                editor.select(&ids);
                None
            }
        }
    }
}

fn single_selected_node(editor: &Editor) -> Option<&sanflow::Node> {
    let id = editor.selection().single()?;
    editor.graph().node(id)
}

/// Resize handle of the single selected node within `radius` of `p`.
fn handle_at(editor: &Editor, p: Point, radius: f32) -> Option<(CellId, ResizeHandle)> {
    let node = single_selected_node(editor)?;
    let bounds = node.bounds();
    ResizeHandle::ALL
        .into_iter()
        .find(|h| h.position(bounds).distance(p) <= radius)
        .map(|h| (node.id, h))
}

fn cursor_for(handle: ResizeHandle) -> egui::CursorIcon {
    match handle {
        ResizeHandle::N | ResizeHandle::S => egui::CursorIcon::ResizeVertical,
        ResizeHandle::E | ResizeHandle::W => egui::CursorIcon::ResizeHorizontal,
        ResizeHandle::NE | ResizeHandle::SW => egui::CursorIcon::ResizeNeSw,
        ResizeHandle::NW | ResizeHandle::SE => egui::CursorIcon::ResizeNwSe,
    }
}

/// Snaps a drag of `ids` against every other node. `applied` is how far
/// the nodes have already moved, so their start bounds can be recovered.
fn snap_drag(editor: &Editor, ids: &[CellId], applied: Point, raw: Point, tolerance: f32) -> Snap {
    let graph = editor.graph();
    let moving = transform::union(ids.iter().filter_map(|id| graph.node(*id)).map(|n| n.bounds()));
    let Some(moving) = moving else {
        return Snap {
            delta: raw,
            guides: Vec::new(),
        };
    };
    let start = RectF {
        min: moving.min.offset(-applied.x, -applied.y),
        max: moving.max.offset(-applied.x, -applied.y),
    };
    let others: Vec<RectF> = graph
        .nodes()
        .filter(|n| !ids.contains(&n.id))
        .map(|n| n.bounds())
        .collect();
    transform::snap_to_neighbours(start, raw, &others, tolerance)
}

fn context_menu(ui: &mut egui::Ui, editor: &mut Editor, hit: Option<CellId>) -> Option<String> {
    let mut status = None;
    let has_selection = !editor.selection().is_empty();
    if ui
        .add_enabled(has_selection, egui::Button::new("Copy"))
        .clicked()
    {
        let count = editor.copy_selection();
        status = Some(format!("Copied {count} cells"));
        ui.close_menu();
    }
    if ui
        .add_enabled(editor.clipboard().is_some(), egui::Button::new("Paste"))
        .clicked()
    {
        let pasted = editor.paste();
        status = Some(format!("Pasted {} cells", pasted.len()));
        ui.close_menu();
    }
    if ui
        .add_enabled(has_selection, egui::Button::new("Delete"))
        .clicked()
    {
        status = Some(match editor.remove_selection() {
            Ok(removed) => format!("Deleted {} cells", removed.len()),
            Err(err) => format!("Delete failed: {err}"),
        });
        ui.close_menu();
    }
    let node = hit.filter(|id| editor.graph().node(*id).is_some());
    if ui
        .add_enabled(node.is_some(), egui::Button::new("Clear connections"))
        .clicked()
    {
        if let Some(id) = node {
            status = Some(match editor.clear_connections(id) {
                Ok(removed) => format!("Removed {} connections", removed.len()),
                Err(err) => format!("Clear failed: {err}"),
            });
        }
        ui.close_menu();
    }
    status
}
