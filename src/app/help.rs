use eframe::egui;

pub(super) fn draw_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Help & Shortcuts")
        .open(open)
        .resizable(true)
        .default_width(480.0)
        .default_height(420.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Keyboard Shortcuts");
                ui.separator();

                ui.label("General");
                help_row(ui, "⌘S", "Save diagram");
                help_row(ui, "⌘O", "Open diagram from a local file");
                help_row(ui, "⌘Z", "Undo");
                help_row(ui, "⌘⇧Z / ⌘Y", "Redo");
                help_row(ui, "F1", "Show this window");

                ui.add_space(10.0);
                ui.label("Selection & Editing");
                help_row(ui, "⌘C", "Copy selected");
                help_row(ui, "⌘X", "Cut selected");
                help_row(ui, "⌘V", "Paste");
                help_row(ui, "Delete / Backspace", "Delete selected");
                help_row(ui, "Shift + click", "Add to or remove from selection");
                help_row(ui, "Drag on empty space", "Rubber-band select");
                help_row(ui, "Drag a handle", "Resize the selected node");
                help_row(ui, "Shift + corner drag", "Resize keeping proportions");

                ui.add_space(10.0);
                ui.label("Canvas");
                help_row(ui, "Drag from a port", "Connect two nodes");
                help_row(ui, "Scroll wheel", "Zoom in/out");
                help_row(ui, "Middle drag", "Pan");
                help_row(ui, "Right-click", "Copy, paste, delete, clear connections");

                ui.add_space(20.0);
                ui.heading("Stencil");
                ui.separator();
                ui.label("Drag an entry from the left panel onto the canvas, or click it to drop it in the middle of the view.");
                ui.label("Click a Function node to edit its configuration in the bottom drawer.");

                ui.add_space(20.0);
                ui.heading("Settings");
                ui.separator();
                ui.label("Settings are read from ~/.config/sanflow.toml, settings.toml or settings.json:");
                ui.add_space(5.0);
                ui.code(r##"remote_url = "http://localhost:3000"
snap_radius = 20.0
allow_loop = true
crossing_edges = "skip"   # or "reattach"

[default_route]
name = "orthogonal"
radius = 8.0"##);
            });
        });
}

fn help_row(ui: &mut egui::Ui, shortcut: &str, description: &str) {
    ui.horizontal(|ui| {
        ui.add_sized(
            [140.0, 16.0],
            egui::Label::new(egui::RichText::new(shortcut).monospace().strong()),
        );
        ui.label(description);
    });
}
