use crate::tools::{EraserMode, ToolSettings};
use egui::{Color32, Vec2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Editor-wide settings. Every field has a default so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub fps: u32,
    pub looping: bool,
    #[serde(with = "crate::util::color::hex")]
    pub brush_color: Color32,
    pub brush_size: f32,
    pub eraser_size: f32,
    pub eraser_mode: EraserMode,
    /// Global alpha of the previous frame when onion skinning
    pub onion_skin_alpha: f32,
    /// Grid spacing in canvas pixels
    pub grid_pitch: f32,
    /// Offset applied by duplicate, in canvas pixels
    pub duplicate_offset: [f32; 2],
    /// Where autosaves go; `None` disables autosave
    pub autosave_dir: Option<PathBuf>,
    pub max_autosaves: usize,
    /// Seconds between autosaves
    pub autosave_interval: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1280,
            canvas_height: 720,
            fps: 12,
            looping: true,
            brush_color: Color32::BLACK,
            brush_size: 3.0,
            eraser_size: 10.0,
            eraser_mode: EraserMode::Precision,
            onion_skin_alpha: 0.3,
            grid_pitch: 20.0,
            duplicate_offset: [10.0, 10.0],
            autosave_dir: None,
            max_autosaves: 5,
            autosave_interval: 300,
        }
    }
}

impl EditorConfig {
    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Startup config: the file at `path` when one is given and readable,
    /// `fallback` otherwise
    pub fn load_or(path: Option<&Path>, fallback: Self) -> Self {
        let Some(path) = path else {
            return fallback;
        };
        if !path.exists() {
            log::warn!("config {} not found, keeping stored settings", path.display());
            return fallback;
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("ignoring config {}: {}", path.display(), err);
                fallback
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn canvas_size(&self) -> Vec2 {
        Vec2::new(self.canvas_width as f32, self.canvas_height as f32)
    }

    pub fn duplicate_offset(&self) -> Vec2 {
        Vec2::new(self.duplicate_offset[0], self.duplicate_offset[1])
    }

    /// Initial tool settings for a new session
    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            color: self.brush_color,
            brush_size: self.brush_size,
            eraser_size: self.eraser_size,
            eraser_mode: self.eraser_mode,
        }
    }
}
