use eframe::egui;
use sanflow::Editor;
use sanflow::loader::Payload;
use sanflow::model::RouteStyle;
use sanflow::selection::{FONT_SIZE_RANGE, PropertyEdit, SIZE_RANGE};
use sanflow::stencil::MarkerNode;
use std::time::Duration;

use super::drawer::opens_drawer;
use super::help::draw_help_window;
use super::render::{draw_marker, palette_entry};
use super::{FlowApp, Focus, Pending, color_hex, parse_color};

impl eframe::App for FlowApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_loader();
        self.handle_shortcuts(ctx);

        self.top_bar(ctx);
        self.status_bar(ctx);
        if self.drawer_control.is_open() {
            let outcome = self.drawer.show(
                ctx,
                &mut self.editor,
                &mut self.drawer_control,
                &self.settings,
                &mut self.palette_drag,
            );
            if outcome.interacted {
                self.focus = Focus::Drawer;
            }
            if outcome.status.is_some() {
                self.status = outcome.status;
            }
        }
        self.stencil_panel(ctx);
        self.property_panel(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let outcome = self
                    .canvas
                    .show(ui, &mut self.editor, &self.settings, &self.palette_drag);
                if outcome.interacted {
                    self.focus = Focus::Main;
                }
                if let Some(id) = outcome.clicked_node {
                    if opens_drawer(&self.editor, id) {
                        self.drawer_control.open_for(id);
                    }
                }
                if outcome.status.is_some() {
                    self.status = outcome.status;
                }
            });

        if let Some(pending) = self.remote.show(ctx, &mut self.loader) {
            self.pending = Some(pending);
        }
        if self.show_help {
            draw_help_window(ctx, &mut self.show_help);
        }
        self.palette_ghost(ctx);

        if self.loader.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

impl FlowApp {
    fn poll_loader(&mut self) {
        let Some(done) = self.loader.poll() else {
            return;
        };
        let pending = self.pending.take();
        match (done.result, pending) {
            (Ok(Payload::Document(doc)), pending) => {
                let cells = doc.cells.len();
                match self.editor.load_document(doc) {
                    Ok(()) => {
                        self.drawer.detach(&mut self.drawer_control);
                        match pending {
                            Some(Pending::Local(path)) => {
                                self.file_path = path.display().to_string();
                                self.persist_settings();
                            }
                            Some(Pending::Remote(_)) => self.remote.close(&mut self.loader),
                            _ => {}
                        }
                        self.status = Some(format!("Loaded {} ({cells} cells)", done.label));
                    }
                    Err(err) => self.status = Some(format!("Load failed: {err}")),
                }
            }
            (Ok(Payload::Files(files)), Some(Pending::Listing(key))) => {
                self.remote.accept_listing(key, files);
            }
            (Ok(Payload::Files(files)), _) => self.remote.accept_listing(None, files),
            (Err(err), pending) => {
                let message = format!("Load failed: {err}");
                if matches!(pending, Some(Pending::Listing(_) | Pending::Remote(_))) {
                    self.remote.fail(message.clone());
                }
                self.status = Some(message);
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() || self.remote.is_open() {
            return;
        }
        let (copy, cut, paste) = ctx.input(|i| {
            let mut flags = (false, false, false);
            for event in &i.events {
                match event {
                    egui::Event::Copy => flags.0 = true,
                    egui::Event::Cut => flags.1 = true,
                    egui::Event::Paste(_) => flags.2 = true,
                    _ => {}
                }
            }
            flags
        });
        let (undo, redo, delete, save, open, help) = ctx.input_mut(|i| {
            let redo = i.consume_key(
                egui::Modifiers::COMMAND | egui::Modifiers::SHIFT,
                egui::Key::Z,
            ) || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y);
            let undo = !redo && i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z);
            let delete = i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace);
            let save = i.consume_key(egui::Modifiers::COMMAND, egui::Key::S);
            let open = i.consume_key(egui::Modifiers::COMMAND, egui::Key::O);
            let help = i.consume_key(egui::Modifiers::NONE, egui::Key::F1);
            (undo, redo, delete, save, open, help)
        });

        if copy {
            self.copy_selected();
        }
        if cut {
            self.cut_selected();
        }
        if paste {
            self.paste();
        }
        if undo {
            self.undo();
        }
        if redo {
            self.redo();
        }
        if delete {
            self.delete_selected();
        }
        if save {
            self.save();
        }
        if open {
            self.open_local_dialog();
        }
        if help {
            self.show_help = true;
        }
    }

    // ---- actions ---------------------------------------------------------

    fn copy_selected(&mut self) {
        let count = self.active_editor().copy_selection();
        if count > 0 {
            self.status = Some(format!("Copied {count} cells"));
        }
    }

    fn cut_selected(&mut self) {
        let result = self.active_editor().cut_selection();
        self.status = match result {
            Ok(removed) if removed.is_empty() => None,
            Ok(removed) => Some(format!("Cut {} cells", removed.len())),
            Err(err) => Some(format!("Cut failed: {err}")),
        };
    }

    fn paste(&mut self) {
        let pasted = self.active_editor().paste();
        self.status = if pasted.is_empty() {
            Some("Nothing to paste".to_string())
        } else {
            Some(format!("Pasted {} cells", pasted.len()))
        };
    }

    fn delete_selected(&mut self) {
        let result = self.active_editor().remove_selection();
        if let Err(err) = result {
            self.status = Some(format!("Delete failed: {err}"));
        }
    }

    fn undo(&mut self) {
        let editor = self.active_editor();
        let label = editor.undo_label().map(str::to_string);
        if editor.undo() {
            self.status = label.map(|l| format!("Undid {l}"));
        }
    }

    fn redo(&mut self) {
        let editor = self.active_editor();
        let label = editor.redo_label().map(str::to_string);
        if editor.redo() {
            self.status = label.map(|l| format!("Redid {l}"));
        }
    }

    fn save(&mut self) {
        if self.drawer.is_dirty() {
            if let Err(err) = self.drawer.apply(&mut self.editor) {
                self.status = Some(format!("Function config not saved: {err}"));
            }
        }
        match self.editor.document().write(&self.file_path) {
            Ok(()) => {
                self.status = Some(format!("Saved {}", self.file_path));
                self.persist_settings();
            }
            Err(err) => self.status = Some(format!("Save failed: {err}")),
        }
    }

    fn save_as_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name("flowchart.json")
            .add_filter("JSON", &["json"])
            .save_file()
        {
            self.file_path = path.display().to_string();
            self.save();
        }
    }

    fn open_local_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            self.loader.request_local(&path);
            self.pending = Some(Pending::Local(path));
            self.status = Some("Loading...".to_string());
        }
    }

    fn open_remote_dialog(&mut self) {
        self.pending = self.remote.open(&mut self.loader);
    }

    fn zoom(&mut self, direction: f32) {
        self.canvas.zoom_step(&self.settings, direction);
    }

    // ---- panels ----------------------------------------------------------

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open... (⌘O)").clicked() {
                        self.open_local_dialog();
                        ui.close_menu();
                    }
                    if ui.button("Load from server...").clicked() {
                        self.open_remote_dialog();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Save (⌘S)").clicked() {
                        self.save();
                        ui.close_menu();
                    }
                    if ui.button("Save as...").clicked() {
                        self.save_as_dialog();
                        ui.close_menu();
                    }
                    ui.separator();
                    ui.small("Save path:");
                    if ui.text_edit_singleline(&mut self.file_path).lost_focus() {
                        self.persist_settings();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    let editor = self.active_editor();
                    let undo_text = match editor.undo_label() {
                        Some(label) => format!("Undo {label} (⌘Z)"),
                        None => "Undo (⌘Z)".to_string(),
                    };
                    let redo_text = match editor.redo_label() {
                        Some(label) => format!("Redo {label} (⌘⇧Z)"),
                        None => "Redo (⌘⇧Z)".to_string(),
                    };
                    let (can_undo, can_redo) = (editor.can_undo(), editor.can_redo());
                    let has_selection = !editor.selection().is_empty();
                    let has_clipboard = editor.clipboard().is_some();
                    if ui.add_enabled(can_undo, egui::Button::new(undo_text)).clicked() {
                        self.undo();
                        ui.close_menu();
                    }
                    if ui.add_enabled(can_redo, egui::Button::new(redo_text)).clicked() {
                        self.redo();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.add_enabled(has_selection, egui::Button::new("Cut (⌘X)")).clicked() {
                        self.cut_selected();
                        ui.close_menu();
                    }
                    if ui.add_enabled(has_selection, egui::Button::new("Copy (⌘C)")).clicked() {
                        self.copy_selected();
                        ui.close_menu();
                    }
                    if ui.add_enabled(has_clipboard, egui::Button::new("Paste (⌘V)")).clicked() {
                        self.paste();
                        ui.close_menu();
                    }
                    if ui.add_enabled(has_selection, egui::Button::new("Delete (Del)")).clicked() {
                        self.delete_selected();
                        ui.close_menu();
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.button("Zoom in").clicked() {
                        self.zoom(1.0);
                        ui.close_menu();
                    }
                    if ui.button("Zoom out").clicked() {
                        self.zoom(-1.0);
                        ui.close_menu();
                    }
                    if ui.button("Reset view").clicked() {
                        self.canvas.reset_view();
                        ui.close_menu();
                    }
                    if ui.checkbox(&mut self.settings.snapline, "Alignment guides").changed() {
                        self.persist_settings();
                    }
                    ui.separator();
                    if ui.button("Function drawer").clicked() {
                        self.drawer_control.toggle();
                        ui.close_menu();
                    }
                });
                ui.menu_button("Help", |ui| {
                    if ui.button("Shortcuts (F1)").clicked() {
                        self.show_help = true;
                        ui.close_menu();
                    }
                });

                ui.separator();
                if ui.button("Save").clicked() {
                    self.save();
                }
                if ui.button("Open").clicked() {
                    self.open_local_dialog();
                }
                if ui.button("Server").clicked() {
                    self.open_remote_dialog();
                }
                ui.separator();
                let editor = self.active_editor();
                let (can_undo, can_redo) = (editor.can_undo(), editor.can_redo());
                if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() {
                    self.undo();
                }
                if ui.add_enabled(can_redo, egui::Button::new("Redo")).clicked() {
                    self.redo();
                }
                ui.separator();
                let at_min = self.canvas.view.zoom <= self.settings.min_zoom;
                let at_max = self.canvas.view.zoom >= self.settings.max_zoom;
                if ui.add_enabled(!at_min, egui::Button::new("−")).clicked() {
                    self.zoom(-1.0);
                }
                ui.label(format!("{:.0}%", self.canvas.view.zoom * 100.0));
                if ui.add_enabled(!at_max, egui::Button::new("+")).clicked() {
                    self.zoom(1.0);
                }
            });
        });
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let drawer_label = if self.drawer_control.is_open() {
                    "▾ Function drawer"
                } else {
                    "▴ Function drawer"
                };
                if ui.selectable_label(self.drawer_control.is_open(), drawer_label).clicked() {
                    self.drawer_control.toggle();
                }
                ui.separator();
                match &self.status {
                    Some(status) => ui.label(status.as_str()),
                    None => ui.label("Ready"),
                };
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let graph = self.editor.graph();
                    ui.label(format!("Zoom: {:.0}%", self.canvas.view.zoom * 100.0));
                    ui.separator();
                    ui.label(format!(
                        "Nodes: {}  Edges: {}",
                        graph.nodes().count(),
                        graph.edges().count()
                    ));
                    ui.separator();
                    ui.label(format!("Selected: {}", self.editor.selection().len()));
                    if self.loader.is_busy() {
                        ui.separator();
                        ui.spinner();
                    }
                });
            });
        });
    }

    fn stencil_panel(&mut self, ctx: &egui::Context) {
        let mut clicked: Option<MarkerNode> = None;
        egui::SidePanel::left("stencil_panel")
            .resizable(true)
            .default_width(200.0)
            .min_width(180.0)
            .show(ctx, |ui| {
                ui.heading("Stencil");
                ui.add(
                    egui::TextEdit::singleline(&mut self.stencil_query)
                        .hint_text("Search shapes"),
                );
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if self.stencil_query.trim().is_empty() {
                        for group in self.stencil.groups() {
                            ui.label(group.title.as_str());
                            for entry in &group.entries {
                                if palette_entry(ui, entry, &mut self.palette_drag) {
                                    clicked = Some(entry.marker());
                                }
                            }
                            ui.add_space(8.0);
                        }
                    } else {
                        let hits = self.stencil.search(&self.stencil_query);
                        if hits.is_empty() {
                            ui.weak("No matching shapes");
                        }
                        for entry in hits {
                            if palette_entry(ui, entry, &mut self.palette_drag) {
                                clicked = Some(entry.marker());
                            }
                        }
                    }
                });
            });
        if let Some(marker) = clicked {
            self.focus = Focus::Main;
            if let Some(err) = self.canvas.drop_at_center(&mut self.editor, &marker) {
                self.status = Some(err);
            }
        }
    }

    fn property_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("property_panel")
            .resizable(true)
            .default_width(240.0)
            .min_width(200.0)
            .show(ctx, |ui| {
                ui.heading("Properties");
                let in_drawer = self.focus == Focus::Drawer && self.drawer_control.is_open();
                if in_drawer {
                    ui.small("Function config");
                }
                ui.separator();
                let editor = self.active_editor();
                if let Some(status) = property_form(ui, editor) {
                    self.status = Some(status);
                }
            });
    }

    fn palette_ghost(&mut self, ctx: &egui::Context) {
        let Some(marker) = &self.palette_drag else {
            return;
        };
        if ctx.input(|i| i.pointer.any_released()) {
            self.palette_drag = None;
            return;
        }
        if let Some(pos) = ctx.input(|i| i.pointer.hover_pos()) {
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Tooltip,
                egui::Id::new("palette_ghost"),
            ));
            draw_marker(&painter, pos, marker);
        }
        ctx.request_repaint();
    }
}

/// Opens an undo batch when a field starts being edited and closes it when
/// the edit ends, so one drag or one text edit is one undo step.
fn edit_field(
    editor: &mut Editor,
    response: &egui::Response,
    label: &str,
    edit: Option<PropertyEdit>,
) -> Option<String> {
    if response.drag_started() || response.gained_focus() {
        editor.begin_batch(label);
    }
    let status = edit.and_then(|edit| {
        editor
            .apply_property(edit)
            .err()
            .map(|err| format!("Edit rejected: {err}"))
    });
    if response.drag_stopped() || response.lost_focus() {
        editor.commit_batch();
    }
    status
}

fn color_row(
    ui: &mut egui::Ui,
    editor: &mut Editor,
    current: &str,
    label: &str,
    fill: bool,
) -> Option<String> {
    let mut status = None;
    let make = |hex: String| {
        if fill {
            PropertyEdit::Fill(hex)
        } else {
            PropertyEdit::Stroke(hex)
        }
    };
    ui.horizontal(|ui| {
        let presets = [
            egui::Color32::from_rgb(0x5F, 0x95, 0xFF),
            egui::Color32::from_rgb(0xEF, 0xF4, 0xFF),
            egui::Color32::from_rgb(0xFF, 0x99, 0x66),
            egui::Color32::from_rgb(0x52, 0xC4, 0x1A),
            egui::Color32::from_rgb(0xA2, 0xB1, 0xC3),
            egui::Color32::from_rgb(0x26, 0x26, 0x26),
        ];
        for c in presets {
            if ui
                .add_sized([16.0, 16.0], egui::Button::new("").fill(c))
                .clicked()
            {
                status = editor
                    .apply_property(make(color_hex(c)))
                    .err()
                    .map(|err| format!("Edit rejected: {err}"));
            }
        }
    });
    let swatch = parse_color(Some(current), egui::Color32::TRANSPARENT);
    ui.horizontal(|ui| {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(16.0, 16.0), egui::Sense::hover());
        ui.painter().rect_filled(rect, 2.0, swatch);
        let mut hex = current.to_string();
        let response = ui.add(egui::TextEdit::singleline(&mut hex).desired_width(90.0));
        let edit = (response.changed() && egui::Color32::from_hex(hex.trim()).is_ok())
            .then(|| make(hex.trim().to_string()));
        if let Some(s) = edit_field(editor, &response, label, edit) {
            status = Some(s);
        }
    });
    status
}

fn property_form(ui: &mut egui::Ui, editor: &mut Editor) -> Option<String> {
    let Some(view) = editor.properties().cloned() else {
        match editor.selection().len() {
            0 => ui.weak("Nothing selected"),
            n => ui.weak(format!("{n} cells selected")),
        };
        return None;
    };
    let mut status = None;
    let kind = if view.is_node() { "Node" } else { "Edge" };
    ui.strong(format!("{kind} {}", view.id));
    ui.add_space(4.0);

    ui.label("Label");
    let mut label = view.label.clone();
    let response = ui.text_edit_singleline(&mut label);
    let edit = response.changed().then(|| PropertyEdit::Label(label));
    status = edit_field(editor, &response, "edit label", edit).or(status);

    ui.label("Stroke");
    status = color_row(ui, editor, &view.stroke, "edit stroke", false).or(status);

    if let Some(fill) = &view.fill {
        ui.label("Fill");
        status = color_row(ui, editor, fill, "edit fill", true).or(status);
    }

    egui::Grid::new("property_numbers")
        .num_columns(2)
        .spacing([8.0, 6.0])
        .show(ui, |ui| {
            ui.label("Font size");
            let mut size = view.font_size;
            let response = ui.add(
                egui::DragValue::new(&mut size)
                    .range(FONT_SIZE_RANGE)
                    .speed(0.5),
            );
            let edit = response.changed().then_some(PropertyEdit::FontSize(size));
            status = edit_field(editor, &response, "edit font size", edit).or(status.take());
            ui.end_row();

            if let (Some(w), Some(h)) = (view.width, view.height) {
                ui.label("Width");
                let mut width = w;
                let response = ui.add(egui::DragValue::new(&mut width).range(SIZE_RANGE).speed(1.0));
                let edit = response.changed().then_some(PropertyEdit::Width(width));
                status = edit_field(editor, &response, "resize", edit).or(status.take());
                ui.end_row();

                ui.label("Height");
                let mut height = h;
                let response = ui.add(egui::DragValue::new(&mut height).range(SIZE_RANGE).speed(1.0));
                let edit = response.changed().then_some(PropertyEdit::Height(height));
                status = edit_field(editor, &response, "resize", edit).or(status.take());
                ui.end_row();
            }
        });

    if let Some(route) = editor.graph().edge(view.id).map(|e| e.route) {
        ui.add_space(6.0);
        ui.label("Route");
        let mut selected = route;
        let name = |r: RouteStyle| match r {
            RouteStyle::Straight => "Straight",
            RouteStyle::Orthogonal { .. } => "Orthogonal",
            RouteStyle::Smooth => "Smooth",
        };
        egui::ComboBox::from_id_salt("edge_route")
            .selected_text(name(route))
            .show_ui(ui, |ui| {
                let orthogonal = match route {
                    RouteStyle::Orthogonal { .. } => route,
                    _ => RouteStyle::default(),
                };
                for option in [RouteStyle::Straight, orthogonal, RouteStyle::Smooth] {
                    ui.selectable_value(&mut selected, option, name(option));
                }
            });
        if selected != route {
            if let Err(err) = editor.set_route(view.id, selected) {
                status = Some(format!("Route change rejected: {err}"));
            }
        }
    }
    status
}
