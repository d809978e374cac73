use eframe::egui;
use sanflow::Editor;
use sanflow::config::{self, EditorSettings};
use sanflow::loader::Loader;
use sanflow::model::Point;
use sanflow::stencil::{MarkerNode, Stencil};
use std::path::PathBuf;

mod drawer;
mod help;
mod interaction;
mod remote_dialog;
mod render;
mod update;

use drawer::{DrawerControl, FunctionDrawer};
use interaction::Canvas;
use remote_dialog::RemoteDialog;

#[derive(Clone, Copy, Debug)]
struct View {
    pan_screen: egui::Vec2,
    zoom: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            pan_screen: egui::Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl View {
    fn world_to_screen(&self, origin: egui::Pos2, world: Point) -> egui::Pos2 {
        origin + self.pan_screen + egui::vec2(world.x, world.y) * self.zoom
    }

    fn screen_to_world(&self, origin: egui::Pos2, screen: egui::Pos2) -> Point {
        let v = (screen - origin - self.pan_screen) / self.zoom;
        Point::new(v.x, v.y)
    }

    fn zoom_about_screen_point(
        &mut self,
        origin: egui::Pos2,
        screen_point: egui::Pos2,
        zoom: f32,
    ) {
        let before = self.screen_to_world(origin, screen_point);
        self.zoom = zoom;
        let after_screen = self.world_to_screen(origin, before);
        self.pan_screen += screen_point - after_screen;
    }
}

/// Which editor keyboard shortcuts go to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Focus {
    Main,
    Drawer,
}

/// Request in flight on the loader, so its result can be routed.
#[derive(Clone, Debug)]
enum Pending {
    Local(PathBuf),
    Listing(Option<String>),
    Remote(String),
}

pub struct FlowApp {
    editor: Editor,
    settings: EditorSettings,
    settings_path: PathBuf,
    file_path: String,
    canvas: Canvas,
    stencil: Stencil,
    stencil_query: String,
    palette_drag: Option<MarkerNode>,
    loader: Loader,
    pending: Option<Pending>,
    remote: RemoteDialog,
    drawer_control: DrawerControl,
    drawer: FunctionDrawer,
    focus: Focus,
    status: Option<String>,
    show_help: bool,
}

impl FlowApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (settings, settings_path) = config::load_or_default();
        let editor = Editor::new(settings.editor());
        let drawer = FunctionDrawer::new(&settings);
        Self {
            editor,
            file_path: settings.file_path.clone(),
            remote: RemoteDialog::new(&settings.remote_url),
            settings,
            settings_path,
            canvas: Canvas::default(),
            stencil: Stencil::flowchart(),
            stencil_query: String::new(),
            palette_drag: None,
            loader: Loader::new(),
            pending: None,
            drawer_control: DrawerControl::default(),
            drawer,
            focus: Focus::Main,
            status: None,
            show_help: false,
        }
    }

    fn active_editor(&mut self) -> &mut Editor {
        match self.focus {
            Focus::Drawer if self.drawer_control.is_open() => self.drawer.editor_mut(),
            _ => &mut self.editor,
        }
    }

    fn persist_settings(&mut self) {
        self.settings.file_path = self.file_path.clone();
        self.settings.remote_url = self.remote.url().to_string();
        if let Err(err) = config::save_settings(&self.settings_path, &self.settings) {
            self.status = Some(format!("Settings not saved: {err}"));
        }
    }
}

/// `#rgb`, `#rrggbb` or `#rrggbbaa`; anything else falls back.
fn parse_color(value: Option<&str>, fallback: egui::Color32) -> egui::Color32 {
    value
        .and_then(|s| egui::Color32::from_hex(s.trim()).ok())
        .unwrap_or(fallback)
}

fn color_hex(c: egui::Color32) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r(), c.g(), c.b())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_round_trips_points() {
        let mut view = View::default();
        let origin = egui::pos2(10.0, 20.0);
        view.zoom_about_screen_point(origin, egui::pos2(110.0, 120.0), 2.0);
        let p = Point::new(33.0, -7.0);
        let back = view.screen_to_world(origin, view.world_to_screen(origin, p));
        assert!(back.distance(p) < 1e-3);
        // the point under the cursor stays put
        let anchor = view.screen_to_world(origin, egui::pos2(110.0, 120.0));
        assert!(anchor.distance(Point::new(100.0, 100.0)) < 1e-3);
    }

    #[test]
    fn colors_parse_with_fallback() {
        let fallback = egui::Color32::BLACK;
        assert_eq!(
            parse_color(Some("#5F95FF"), fallback),
            egui::Color32::from_rgb(0x5F, 0x95, 0xFF)
        );
        assert_eq!(parse_color(Some("blue-ish"), fallback), fallback);
        assert_eq!(parse_color(None, fallback), fallback);
        assert_eq!(color_hex(egui::Color32::from_rgb(1, 2, 255)), "#0102FF");
    }
}
