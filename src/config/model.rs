//! The configuration document and its normalization rules.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::audio_engine::constants::{VOLUME_MAX, VOLUME_MIN};
use crate::config::hotkey::Hotkey;

pub const DEFAULT_GRID_ROWS: i32 = 4;
pub const DEFAULT_GRID_COLS: i32 = 4;
pub const MAX_GRID_DIM: i32 = 16;
pub const DEFAULT_FONT_SIZE: i32 = 12;
pub const MIN_FONT_SIZE: i32 = 8;
pub const MAX_FONT_SIZE: i32 = 48;
pub const DEFAULT_BUTTON_PADDING: i32 = 6;
pub const MAX_BUTTON_PADDING: i32 = 30;
pub const DEFAULT_PAD_COLOR: &str = "#2d2d2d";

/// How repeated triggers of one pad interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// At most one stream per slot; a new trigger cuts the previous one ("Cut").
    Exclusive,
    /// Every trigger starts another stream ("Overlap").
    #[default]
    Overlapping,
}

impl Policy {
    /// Parses the `Mode` field; anything but "cut" is overlapping.
    pub fn from_mode(mode: &str) -> Self {
        if mode.trim().eq_ignore_ascii_case("cut") {
            Policy::Exclusive
        } else {
            Policy::Overlapping
        }
    }

    pub fn as_mode(self) -> &'static str {
        match self {
            Policy::Exclusive => "Cut",
            Policy::Overlapping => "Overlap",
        }
    }
}

impl Serialize for Policy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_mode())
    }
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(mode)) => Policy::from_mode(&mode),
            _ => Policy::default(),
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One triggerable sound button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Pad {
    pub label: Option<String>,
    pub file_path: Option<String>,
    pub hotkey: Option<String>,
    #[serde(rename = "Mode")]
    pub policy: Policy,
    #[serde(deserialize_with = "null_as_default")]
    pub volume: f32,
    #[serde(deserialize_with = "null_as_default")]
    pub color: String,
}

impl Default for Pad {
    fn default() -> Self {
        Self {
            label: None,
            file_path: None,
            hotkey: None,
            policy: Policy::default(),
            volume: VOLUME_MAX,
            color: DEFAULT_PAD_COLOR.to_string(),
        }
    }
}

impl Pad {
    fn example(label: &str, file: &str, hotkey: &str, color: &str, policy: Policy, volume: f32) -> Self {
        Self {
            label: Some(label.to_string()),
            file_path: Some(file.to_string()),
            hotkey: Some(hotkey.to_string()),
            policy,
            volume,
            color: color.to_string(),
        }
    }

    /// Replaces out-of-range values with their defaults.
    pub fn normalize(&mut self) {
        if !is_hex_color(&self.color) {
            self.color = DEFAULT_PAD_COLOR.to_string();
        }
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(VOLUME_MIN, VOLUME_MAX)
        } else {
            VOLUME_MAX
        };
        for field in [&mut self.label, &mut self.file_path, &mut self.hotkey] {
            if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *field = None;
            }
        }
    }

    /// Button text; `index` is the zero-based slot.
    pub fn display_label(&self, index: usize) -> String {
        match self.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("Pad {}", index + 1),
        }
    }

    pub fn parsed_hotkey(&self) -> Option<Hotkey> {
        self.hotkey.as_deref().and_then(Hotkey::parse)
    }

    /// Resolves the asset path; relative paths are taken from `base`.
    pub fn resolve_file(&self, base: Option<&Path>) -> Option<PathBuf> {
        let raw = self.file_path.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
        let path = PathBuf::from(raw);
        Some(match base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        })
    }
}

fn bounded(value: i32, min: i32, max: i32, default: i32) -> i32 {
    if value < min {
        default
    } else {
        value.min(max)
    }
}

/// `#RRGGBB`.
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Grid shape and button styling, as applied from the settings bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSettings {
    pub rows: i32,
    pub cols: i32,
    pub font_size: i32,
    pub padding: i32,
}

/// The root document persisted as `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Configuration {
    #[serde(deserialize_with = "null_as_default")]
    pub grid_rows: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub grid_cols: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub button_font_size: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub button_padding: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub pads: Vec<Pad>,
    pub selected_output_device_id: Option<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        let mut config = Self {
            grid_rows: DEFAULT_GRID_ROWS,
            grid_cols: DEFAULT_GRID_COLS,
            button_font_size: DEFAULT_FONT_SIZE,
            button_padding: DEFAULT_BUTTON_PADDING,
            pads: Vec::new(),
            selected_output_device_id: None,
        };
        config.resize_pads();
        config
    }
}

impl Configuration {
    /// The document written when no config file exists yet.
    pub fn with_examples() -> Self {
        let mut config = Self {
            pads: vec![
                Pad::example("Intro", "sounds/intro.wav", "1", "#3b82f6", Policy::Exclusive, 1.0),
                Pad::example("Clap", "sounds/clap.mp3", "2", "#16a34a", Policy::Overlapping, 0.9),
                Pad::example("Boo", "sounds/boo.mp3", "3", "#dc2626", Policy::Overlapping, 0.8),
                Pad::example("Jingle", "sounds/jingle.wav", "4", "#9333ea", Policy::Exclusive, 1.0),
            ],
            ..Self::default()
        };
        config.resize_pads();
        config
    }

    /// Clamps every field into its valid range and sizes `pads` to the grid.
    pub fn normalize(&mut self) {
        // Below the minimum means unset; above the maximum is clamped.
        self.grid_rows = bounded(self.grid_rows, 1, MAX_GRID_DIM, DEFAULT_GRID_ROWS);
        self.grid_cols = bounded(self.grid_cols, 1, MAX_GRID_DIM, DEFAULT_GRID_COLS);
        self.button_font_size =
            bounded(self.button_font_size, MIN_FONT_SIZE, MAX_FONT_SIZE, DEFAULT_FONT_SIZE);
        self.button_padding =
            bounded(self.button_padding, 0, MAX_BUTTON_PADDING, DEFAULT_BUTTON_PADDING);
        if self
            .selected_output_device_id
            .as_deref()
            .is_some_and(|id| id.trim().is_empty())
        {
            self.selected_output_device_id = None;
        }
        for pad in &mut self.pads {
            pad.normalize();
        }
        self.resize_pads();
    }

    pub fn rows(&self) -> usize {
        self.grid_rows.clamp(1, MAX_GRID_DIM) as usize
    }

    pub fn cols(&self) -> usize {
        self.grid_cols.clamp(1, MAX_GRID_DIM) as usize
    }

    pub fn pad_count(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Truncates or pads with default pads so `pads.len() == rows * cols`.
    pub fn resize_pads(&mut self) {
        let count = self.pad_count();
        self.pads.resize_with(count, Pad::default);
    }

    pub fn apply_grid(&mut self, settings: GridSettings) {
        self.grid_rows = settings.rows;
        self.grid_cols = settings.cols;
        self.button_font_size = settings.font_size;
        self.button_padding = settings.padding;
        self.normalize();
    }

    pub fn grid_settings(&self) -> GridSettings {
        GridSettings {
            rows: self.grid_rows,
            cols: self.grid_cols,
            font_size: self.button_font_size,
            padding: self.button_padding,
        }
    }
}
