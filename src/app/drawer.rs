//! Bottom drawer hosting the function-config sub-editor.
//!
//! The drawer edits a second, independent diagram built from the function
//! palette. Its contents are stored on the owning node as a JSON string
//! under `data.config`, so applying it is an ordinary undoable attribute
//! edit on the main diagram.

use eframe::egui;
use sanflow::Editor;
use sanflow::config::EditorSettings;
use sanflow::document::Document;
use sanflow::graph::ChangeOrigin;
use sanflow::model::{Attrs, CellId, Point};
use sanflow::stencil::{MarkerNode, Stencil, TemplateKind};
use std::cell::Cell;
use std::rc::Rc;

use super::interaction::{Canvas, CanvasOutcome};
use super::render::palette_entry;

const CONFIG_GROUP: &str = "data";
const CONFIG_KEY: &str = "config";

/// Open/close handle passed to whatever needs to show the drawer.
#[derive(Clone, Debug, Default, PartialEq)]
pub(super) struct DrawerControl {
    open: bool,
    target: Option<CellId>,
}

impl DrawerControl {
    pub fn open_for(&mut self, id: CellId) {
        self.open = true;
        self.target = Some(id);
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn target(&self) -> Option<CellId> {
        self.target
    }
}

/// What a function node starts with before anything is applied: a single
/// function node at (100, 100).
fn starter_document() -> Document {
    let mut seed = Editor::default();
    let kind = TemplateKind::Function;
    if let Err(err) = seed.add_node(kind.shape(), Point::new(100.0, 100.0), &kind.overrides()) {
        tracing::warn!(%err, "function template unavailable");
    }
    seed.document()
}

/// Nodes whose click opens the drawer.
pub(super) fn opens_drawer(editor: &Editor, id: CellId) -> bool {
    editor
        .graph()
        .node(id)
        .is_some_and(|n| n.shape == TemplateKind::Function.shape())
}

pub(super) struct FunctionDrawer {
    editor: Editor,
    canvas: Canvas,
    stencil: Stencil,
    target: Option<CellId>,
    dirty: Rc<Cell<bool>>,
}

impl FunctionDrawer {
    pub fn new(settings: &EditorSettings) -> Self {
        let mut editor = Editor::new(settings.editor());
        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);
        editor.subscribe(move |event| {
            if event.origin != ChangeOrigin::Load {
                flag.set(true);
            }
        });
        Self {
            editor,
            canvas: Canvas::default(),
            stencil: Stencil::functions(),
            target: None,
            dirty,
        }
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Forgets the current node without saving, for when the main diagram
    /// is replaced underneath it.
    pub fn detach(&mut self, control: &mut DrawerControl) {
        *control = DrawerControl::default();
        self.target = None;
        if let Err(err) = self.editor.load_document(Document::default()) {
            tracing::warn!(%err, "resetting function drawer");
        }
        self.dirty.set(false);
    }

    /// Writes the sub-diagram back onto its node.
    pub fn apply(&mut self, main: &mut Editor) -> Result<(), String> {
        let Some(target) = self.target else {
            return Err("No function node selected".to_string());
        };
        let json = self.editor.document().to_json().map_err(|e| e.to_string())?;
        main.update_attrs(target, &Attrs::new().with(CONFIG_GROUP, CONFIG_KEY, json))
            .map_err(|e| e.to_string())?;
        self.dirty.set(false);
        Ok(())
    }

    /// Follows the control's target, saving pending edits for the previous
    /// node first.
    fn sync(&mut self, control: &DrawerControl, main: &mut Editor) -> Option<String> {
        if control.target() == self.target {
            return None;
        }
        let mut status = None;
        if self.is_dirty() && self.target.is_some_and(|id| main.graph().contains(id)) {
            if let Err(err) = self.apply(main) {
                status = Some(format!("Function config not saved: {err}"));
            }
        }
        self.target = control.target();
        let stored = self
            .target
            .and_then(|id| main.graph().node(id))
            .and_then(|n| n.attrs.text(CONFIG_GROUP, CONFIG_KEY))
            .map(Document::parse);
        let document = match stored {
            Some(Ok(doc)) => doc,
            Some(Err(err)) => {
                status = Some(format!("Stored function config unreadable: {err}"));
                Document::default()
            }
            None if self.target.is_some() => starter_document(),
            None => Document::default(),
        };
        if let Err(err) = self.editor.load_document(document) {
            status = Some(format!("Function config rejected: {err}"));
        }
        self.dirty.set(false);
        self.canvas.reset_view();
        status
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        main: &mut Editor,
        control: &mut DrawerControl,
        settings: &EditorSettings,
        palette: &mut Option<MarkerNode>,
    ) -> CanvasOutcome {
        let mut outcome = CanvasOutcome {
            status: self.sync(control, main),
            ..CanvasOutcome::default()
        };
        if let Some(id) = self.target {
            if !main.graph().contains(id) {
                control.close();
                outcome.status = Some(format!("Function node {id} no longer exists"));
                return outcome;
            }
        }

        egui::TopBottomPanel::bottom("function_drawer")
            .resizable(true)
            .default_height(280.0)
            .min_height(160.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    match self.target {
                        Some(id) => ui.strong(format!("Function config for {id}")),
                        None => ui.strong("Function config"),
                    };
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Close").clicked() {
                            control.close();
                        }
                        let can_apply = self.is_dirty() && self.target.is_some();
                        if ui
                            .add_enabled(can_apply, egui::Button::new("Apply"))
                            .clicked()
                        {
                            outcome.status = Some(match self.apply(main) {
                                Ok(()) => "Function config applied".to_string(),
                                Err(err) => format!("Apply failed: {err}"),
                            });
                        }
                    });
                });
                ui.separator();

                egui::SidePanel::left("function_palette")
                    .resizable(false)
                    .exact_width(180.0)
                    .show_inside(ui, |ui| {
                        for group in self.stencil.groups() {
                            ui.label(group.title.as_str());
                            for entry in &group.entries {
                                if palette_entry(ui, entry, palette) {
                                    outcome.status =
                                        self.canvas.drop_at_center(&mut self.editor, &entry.marker());
                                    outcome.interacted = true;
                                }
                            }
                        }
                    });
                egui::CentralPanel::default().show_inside(ui, |ui| {
                    let inner = self.canvas.show(ui, &mut self.editor, settings, palette);
                    outcome.interacted |= inner.interacted;
                    if inner.status.is_some() {
                        outcome.status = inner.status;
                    }
                });
            });
        outcome
    }
}
