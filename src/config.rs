use std::io::ErrorKind;
use std::num::NonZeroUsize;

use anyhow::Context;
use macroquad::color::{Color, BLACK};
use serde::{Deserialize, Serialize};

use crate::input::{parse_chord, ShortcutAction, Shortcuts};
use crate::session::SessionConfig;
use crate::stroke::{StrokeStyle, DEFAULT_STROKE_WIDTH};
use crate::utility::{parse_hex_color, PALETTE};

pub const SETTINGS_FILE: &str = "sketch_canvas.json";

/// Largest canvas side the front end can upload as a single texture.
pub const MAX_CANVAS_SIDE: u32 = 8192;

/// Chord strings per action, e.g. `"Ctrl+Shift+Z"`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShortcutSettings {
    #[serde(default = "default_undo")]
    pub undo: Vec<String>,
    #[serde(default = "default_redo")]
    pub redo: Vec<String>,
    #[serde(default = "default_clear")]
    pub clear: Vec<String>,
    #[serde(default = "default_export")]
    pub export: Vec<String>,
    #[serde(default = "default_import")]
    pub import: Vec<String>,
}

fn default_undo() -> Vec<String> {
    vec!["Ctrl+Z".into()]
}

fn default_redo() -> Vec<String> {
    vec!["Ctrl+Shift+Z".into(), "Ctrl+Y".into()]
}

fn default_clear() -> Vec<String> {
    vec!["Ctrl+Backspace".into()]
}

fn default_export() -> Vec<String> {
    vec!["Ctrl+S".into()]
}

fn default_import() -> Vec<String> {
    vec!["Ctrl+O".into()]
}

impl Default for ShortcutSettings {
    fn default() -> Self {
        Self {
            undo: default_undo(),
            redo: default_redo(),
            clear: default_clear(),
            export: default_export(),
            import: default_import(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
    #[serde(default = "default_brush_width")]
    pub brush_width: f32,
    #[serde(default = "default_brush_color")]
    pub brush_color: String,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    /// Maximum undo depth. `None` keeps every step.
    #[serde(default)]
    pub history_limit: Option<usize>,
    #[serde(default)]
    pub shortcuts: ShortcutSettings,
    #[serde(default = "default_export_file_name")]
    pub export_file_name: String,
    /// Initialise the logger at debug level, `RUST_LOG` can then override it.
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_canvas_width() -> u32 {
    800
}

fn default_canvas_height() -> u32 {
    600
}

fn default_brush_width() -> f32 {
    DEFAULT_STROKE_WIDTH
}

fn default_brush_color() -> String {
    "#000000".into()
}

fn default_palette() -> Vec<String> {
    PALETTE.iter().map(|s| s.to_string()).collect()
}

fn default_export_file_name() -> String {
    "sketch.png".into()
}

fn canvas_side(name: &str, value: u32, default: u32) -> u32 {
    if value == 0 {
        tracing::warn!("{name} must be non-zero; using {default}");
        default
    } else if value > MAX_CANVAS_SIDE {
        tracing::warn!("{name} {value} exceeds {MAX_CANVAS_SIDE}; clamped");
        MAX_CANVAS_SIDE
    } else {
        value
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            brush_width: default_brush_width(),
            brush_color: default_brush_color(),
            palette: default_palette(),
            history_limit: None,
            shortcuts: ShortcutSettings::default(),
            export_file_name: default_export_file_name(),
            debug_logging: false,
        }
    }
}

impl Settings {
    /// Missing or empty file means defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err).with_context(|| format!("read {path}")),
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).with_context(|| format!("parse {path}"))
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize settings")?;
        std::fs::write(path, json).with_context(|| format!("write {path}"))?;
        Ok(())
    }

    /// Canvas size with zero dimensions replaced by the defaults and
    /// oversized ones clamped to [`MAX_CANVAS_SIDE`].
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            canvas_side("canvas_width", self.canvas_width, default_canvas_width()),
            canvas_side("canvas_height", self.canvas_height, default_canvas_height()),
        )
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        let color = match parse_hex_color(&self.brush_color) {
            Some(color) => color,
            None => {
                tracing::warn!(
                    "brush color '{}' is not a hex color; using black",
                    self.brush_color
                );
                BLACK
            }
        };
        let width = if self.brush_width.is_finite() && self.brush_width > 0.0 {
            self.brush_width
        } else {
            tracing::warn!(
                "brush width {} is invalid; using {}",
                self.brush_width,
                DEFAULT_STROKE_WIDTH
            );
            DEFAULT_STROKE_WIDTH
        };
        StrokeStyle { color, width }
    }

    /// Palette swatches that parse; invalid entries are skipped.
    pub fn palette_colors(&self) -> Vec<(String, Color)> {
        self.palette
            .iter()
            .filter_map(|hex| match parse_hex_color(hex) {
                Some(color) => Some((hex.clone(), color)),
                None => {
                    tracing::warn!("palette entry '{}' is not a hex color; skipped", hex);
                    None
                }
            })
            .collect()
    }

    pub fn shortcuts(&self) -> Shortcuts {
        let mut shortcuts = Shortcuts::empty();
        let groups = [
            (&self.shortcuts.undo, ShortcutAction::Undo),
            (&self.shortcuts.redo, ShortcutAction::Redo),
            (&self.shortcuts.clear, ShortcutAction::Clear),
            (&self.shortcuts.export, ShortcutAction::Export),
            (&self.shortcuts.import, ShortcutAction::Import),
        ];
        for (chords, action) in groups {
            for chord in chords {
                match parse_chord(chord) {
                    Some(parsed) => shortcuts.bind(parsed, action),
                    None => tracing::warn!(
                        "shortcut '{}' for {:?} is invalid; ignored",
                        chord,
                        action
                    ),
                }
            }
        }
        shortcuts
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            style: self.stroke_style(),
            history_limit: self.history_limit.and_then(NonZeroUsize::new),
            shortcuts: self.shortcuts(),
        }
    }
}
