use eframe::egui;
use sanflow::loader::Loader;
use sanflow::remote::{FileMeta, FileSource, HttpFileSource};
use std::collections::HashMap;
use std::sync::Arc;

use super::Pending;

/// Browses a remote file tree and picks one diagram to load.
pub(super) struct RemoteDialog {
    open: bool,
    url: String,
    source: Option<Arc<dyn FileSource>>,
    files: Vec<FileMeta>,
    children: HashMap<String, Vec<FileMeta>>,
    selected: Option<FileMeta>,
    error: Option<String>,
}

impl RemoteDialog {
    pub fn new(url: &str) -> Self {
        Self {
            open: false,
            url: url.to_string(),
            source: None,
            files: Vec::new(),
            children: HashMap::new(),
            selected: None,
            error: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self, loader: &mut Loader) -> Option<Pending> {
        self.open = true;
        self.refresh(loader)
    }

    /// Closing abandons anything still in flight.
    pub fn close(&mut self, loader: &mut Loader) {
        self.open = false;
        loader.cancel();
    }

    fn refresh(&mut self, loader: &mut Loader) -> Option<Pending> {
        self.files.clear();
        self.children.clear();
        self.selected = None;
        self.error = None;
        match HttpFileSource::new(&self.url) {
            Ok(source) => {
                let source: Arc<dyn FileSource> = Arc::new(source);
                self.source = Some(Arc::clone(&source));
                loader.request_listing(source, None);
                Some(Pending::Listing(None))
            }
            Err(err) => {
                self.error = Some(err.to_string());
                None
            }
        }
    }

    pub fn accept_listing(&mut self, key: Option<String>, files: Vec<FileMeta>) {
        match key {
            Some(key) => {
                self.children.insert(key, files);
            }
            None => self.files = files,
        }
    }

    pub fn fail(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Draws the window; returns the request it started, if any.
    pub fn show(&mut self, ctx: &egui::Context, loader: &mut Loader) -> Option<Pending> {
        if !self.open {
            return None;
        }
        let mut request = None;
        let mut keep_open = true;
        let mut close_requested = false;
        egui::Window::new("Load from server")
            .open(&mut keep_open)
            .resizable(true)
            .default_width(420.0)
            .default_height(360.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Server:");
                    ui.text_edit_singleline(&mut self.url);
                    if ui.button("Refresh").clicked() {
                        request = self.refresh(loader);
                    }
                });
                if loader.is_busy() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading...");
                    });
                }
                if let Some(err) = &self.error {
                    ui.colored_label(egui::Color32::from_rgb(200, 40, 40), err.as_str());
                }
                ui.separator();

                egui::ScrollArea::vertical().max_height(220.0).show(ui, |ui| {
                    let files = self.files.clone();
                    for file in &files {
                        if let Some(r) = self.file_row(ui, file, loader) {
                            request = Some(r);
                        }
                    }
                    if files.is_empty() && !loader.is_busy() && self.error.is_none() {
                        ui.weak("No files");
                    }
                });

                ui.separator();
                if let Some(selected) = &self.selected {
                    ui.strong(selected.name.as_str());
                    ui.label(selected.description.as_deref().unwrap_or("No description"));
                }
                ui.horizontal(|ui| {
                    let can_load = self.selected.is_some() && self.source.is_some();
                    if ui.add_enabled(can_load, egui::Button::new("Load")).clicked() {
                        if let (Some(file), Some(source)) = (&self.selected, &self.source) {
                            loader.request_remote(Arc::clone(source), file.id.clone());
                            request = Some(Pending::Remote(file.id.clone()));
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        close_requested = true;
                    }
                });
            });
        if !keep_open || close_requested {
            self.close(loader);
            return None;
        }
        request
    }

    fn file_row(
        &mut self,
        ui: &mut egui::Ui,
        file: &FileMeta,
        loader: &mut Loader,
    ) -> Option<Pending> {
        let mut request = None;
        let selected = self.selected.as_ref().is_some_and(|s| s.id == file.id);
        let loaded = self.children.get(&file.id).cloned();
        let nested = if file.is_leaf() { loaded } else { Some(file.children.clone()) };
        match nested {
            None => {
                ui.horizontal(|ui| {
                    if ui.small_button("▸").on_hover_text("Show children").clicked() {
                        if let Some(source) = &self.source {
                            loader.request_listing(Arc::clone(source), Some(file.id.clone()));
                            request = Some(Pending::Listing(Some(file.id.clone())));
                        }
                    }
                    if ui.selectable_label(selected, file.name.as_str()).clicked() {
                        self.selected = Some(file.clone());
                    }
                });
            }
            Some(children) if children.is_empty() => {
                if ui.selectable_label(selected, file.name.as_str()).clicked() {
                    self.selected = Some(file.clone());
                }
            }
            Some(children) => {
                egui::CollapsingHeader::new(file.name.as_str())
                    .id_salt(&file.id)
                    .show(ui, |ui| {
                        if ui.selectable_label(selected, "(this file)").clicked() {
                            self.selected = Some(file.clone());
                        }
                        for child in &children {
                            if let Some(r) = self.file_row(ui, child, loader) {
                                request = Some(r);
                            }
                        }
                    });
            }
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str) -> FileMeta {
        FileMeta {
            id: id.into(),
            name: id.to_uppercase(),
            description: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn listings_route_by_key() {
        let mut dialog = RemoteDialog::new("http://localhost:3000");
        dialog.accept_listing(None, vec![meta("a"), meta("b")]);
        dialog.accept_listing(Some("a".into()), vec![meta("a1")]);
        assert_eq!(dialog.files.len(), 2);
        assert_eq!(dialog.children["a"][0].id, "a1");
    }

    #[test]
    fn closing_cancels_in_flight_loads() {
        let mut dialog = RemoteDialog::new("http://localhost:3000");
        let mut loader = Loader::new();
        let before = loader.generation();
        dialog.close(&mut loader);
        assert!(!dialog.is_open());
        assert!(loader.generation() > before);
    }
}
