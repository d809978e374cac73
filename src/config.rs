use crate::clipboard::CrossingEdges;
use crate::connection::ConnectionRules;
use crate::editor::EditorConfig;
use crate::error::SettingsError;
use crate::model::RouteStyle;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub file_path: String,
    pub remote_url: String,
    pub paste_offset: f32,
    pub snap_radius: f32,
    pub allow_loop: bool,
    pub allow_blank: bool,
    pub history_limit: usize,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    /// Show alignment guides and snap to them while dragging nodes.
    pub snapline: bool,
    pub snapline_tolerance: f32,
    pub crossing_edges: CrossingEdges,
    pub default_route: RouteStyle,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            file_path: "flowchart.json".to_string(),
            remote_url: "http://localhost:3000".to_string(),
            paste_offset: 32.0,
            snap_radius: 20.0,
            allow_loop: true,
            allow_blank: false,
            history_limit: crate::history::DEFAULT_LIMIT,
            min_zoom: 0.5,
            max_zoom: 3.0,
            zoom_step: 0.1,
            snapline: true,
            snapline_tolerance: 5.0,
            crossing_edges: CrossingEdges::Skip,
            default_route: RouteStyle::default(),
        }
    }
}

impl EditorSettings {
    pub fn connection_rules(&self) -> ConnectionRules {
        ConnectionRules {
            allow_loop: self.allow_loop,
            allow_blank: self.allow_blank,
            snap_radius: self.snap_radius,
        }
    }

    pub fn editor(&self) -> EditorConfig {
        EditorConfig {
            rules: self.connection_rules(),
            history_limit: self.history_limit,
            crossing_edges: self.crossing_edges,
            default_route: self.default_route,
            paste_offset: self.paste_offset,
        }
    }

    fn zoom_bounds_valid(&self) -> bool {
        self.min_zoom.is_finite()
            && self.max_zoom.is_finite()
            && self.min_zoom > 0.0
            && self.max_zoom >= self.min_zoom
    }

    /// Replaces unusable zoom settings with the defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.zoom_bounds_valid() {
            tracing::warn!(
                min = self.min_zoom,
                max = self.max_zoom,
                "invalid zoom bounds, using defaults"
            );
            self.min_zoom = defaults.min_zoom;
            self.max_zoom = defaults.max_zoom;
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            tracing::warn!(step = self.zoom_step, "invalid zoom step, using default");
            self.zoom_step = defaults.zoom_step;
        }
        self
    }

    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        let (min, max) = if self.zoom_bounds_valid() {
            (self.min_zoom, self.max_zoom)
        } else {
            let defaults = Self::default();
            (defaults.min_zoom, defaults.max_zoom)
        };
        if zoom.is_nan() { min } else { zoom.clamp(min, max) }
    }
}

/// First settings file that exists: `~/.config/sanflow.toml`, then
/// `settings.toml`, then `settings.json` in the working directory.
pub fn settings_path() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join(".config").join("sanflow.toml");
        if path.exists() {
            return Some(path);
        }
    }
    ["settings.toml", "settings.json"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

/// Parses by extension, falling back to the other format.
pub fn load_settings(path: &Path) -> Result<EditorSettings, SettingsError> {
    let s = std::fs::read_to_string(path)?;
    let parsed = if is_toml(path) {
        toml::from_str::<EditorSettings>(&s).or_else(|toml_err| {
            serde_json::from_str::<EditorSettings>(&s).map_err(|_| SettingsError::from(toml_err))
        })
    } else {
        serde_json::from_str::<EditorSettings>(&s).or_else(|json_err| {
            toml::from_str::<EditorSettings>(&s).map_err(|_| SettingsError::from(json_err))
        })
    };
    Ok(parsed?.sanitized())
}

pub fn save_settings(path: &Path, settings: &EditorSettings) -> Result<(), SettingsError> {
    let text = if is_toml(path) {
        toml::to_string_pretty(settings)?
    } else {
        serde_json::to_string_pretty(settings)?
    };
    std::fs::write(path, text)?;
    Ok(())
}

/// Settings from the first file found, or defaults. A broken file is
/// logged and ignored.
pub fn load_or_default() -> (EditorSettings, PathBuf) {
    let Some(path) = settings_path() else {
        return (EditorSettings::default(), PathBuf::from("settings.toml"));
    };
    match load_settings(&path) {
        Ok(settings) => {
            tracing::info!(path = %path.display(), "settings loaded");
            (settings, path)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "ignoring unreadable settings");
            (EditorSettings::default(), path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "snap_radius = 12.0\ncrossing_edges = \"reattach\"\n\n[default_route]\nname = \"smooth\"\n",
        )
        .unwrap();
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.snap_radius, 12.0);
        assert_eq!(settings.crossing_edges, CrossingEdges::Reattach);
        assert_eq!(settings.default_route, RouteStyle::Smooth);
        assert_eq!(settings.paste_offset, 32.0);
        assert_eq!(settings.editor().rules.snap_radius, 12.0);
    }

    #[test]
    fn json_with_toml_extension_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, r#"{"allow_loop": false}"#).unwrap();
        assert!(!load_settings(&path).unwrap().allow_loop);
    }

    #[test]
    fn save_then_load_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EditorSettings {
            history_limit: 50,
            default_route: RouteStyle::Orthogonal { radius: 4.0 },
            ..EditorSettings::default()
        };
        for name in ["s.toml", "s.json"] {
            let path = dir.path().join(name);
            save_settings(&path, &settings).unwrap();
            assert_eq!(load_settings(&path).unwrap(), settings);
        }
    }

    #[test]
    fn zoom_is_clamped_to_configured_range() {
        let settings = EditorSettings::default();
        assert_eq!(settings.clamp_zoom(0.1), 0.5);
        assert_eq!(settings.clamp_zoom(10.0), 3.0);
        assert_eq!(settings.clamp_zoom(1.2), 1.2);
    }

    #[test]
    fn unusable_zoom_bounds_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "min_zoom = nan\nmax_zoom = 0.2\nzoom_step = -1.0\n").unwrap();
        let settings = load_settings(&path).unwrap();
        let defaults = EditorSettings::default();
        assert_eq!(settings.min_zoom, defaults.min_zoom);
        assert_eq!(settings.max_zoom, defaults.max_zoom);
        assert_eq!(settings.zoom_step, defaults.zoom_step);

        let raw = EditorSettings {
            min_zoom: f32::NAN,
            ..EditorSettings::default()
        };
        assert_eq!(raw.clamp_zoom(10.0), 3.0);
        assert_eq!(settings.clamp_zoom(f32::NAN), 0.5);
    }
}
