//! Shared types module - effect events, frame payloads and constants
//!
//! This crate defines the data that flows through the Shock Factor pipeline.
//! Everything here is plain data with serde support, usable from the generator,
//! the terminal display and the TCP adapter alike.
//!
//! # Grid Dimensions
//!
//! | View | Columns | Rows |
//! |------|---------|------|
//! | Compact (default) | 40 | 12 |
//! | Full | 80 | 24 |
//!
//! # Timing
//!
//! - `TICK_MS`: 100ms between driver steps (10 frames per second)
//!
//! # Glyph Sets
//!
//! - Pulse ramp: `░▒▓█` (4 shading levels)
//! - Flame glyphs: `. • * ✦ ✹ ✷`
//!
//! # Examples
//!
//! ```
//! use shock_factor_types::{EffectEvent, GridSize, RenderMode};
//!
//! let event = EffectEvent::new("demo", "pulse").with_intensity(0.5);
//! assert_eq!(event.clamped_intensity(), 0.5);
//!
//! let mode: RenderMode = "wordfire".parse().unwrap();
//! assert_eq!(mode, RenderMode::WordFire);
//!
//! assert_eq!(GridSize::for_view(true), GridSize::FULL);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Driver cadence (milliseconds between frames).
pub const TICK_MS: u32 = 100;

/// Intensity used when an event does not carry one.
pub const DEFAULT_INTENSITY: f64 = 0.8;

/// Caption embossed by wordfire mode when the event has no `text`.
pub const DEFAULT_BANNER: &str = " GEMSTANCE  ORCHESTRATOR  ";

/// First column of the wordfire caption.
pub const CAPTION_COLUMN: usize = 6;

/// Shading ramp for pulse mode, dimmest first.
pub const PULSE_RAMP: [char; 4] = ['░', '▒', '▓', '█'];

/// Glyphs a lit flame cell is drawn from.
pub const FLAME_GLYPHS: [char; 6] = ['.', '•', '*', '✦', '✹', '✷'];

/// Rendering variant for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Deterministic sinusoidal band.
    #[default]
    #[serde(rename = "pulse")]
    Pulse,
    /// Stochastic flame with an embossed caption.
    #[serde(rename = "wordfire")]
    WordFire,
}

impl RenderMode {
    pub const ALL: [RenderMode; 2] = [RenderMode::Pulse, RenderMode::WordFire];

    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Pulse => "pulse",
            RenderMode::WordFire => "wordfire",
        }
    }

    /// The other mode.
    pub fn toggled(&self) -> Self {
        match self {
            RenderMode::Pulse => RenderMode::WordFire,
            RenderMode::WordFire => RenderMode::Pulse,
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names neither `pulse` nor `wordfire`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown render mode `{0}` (expected `pulse` or `wordfire`)")]
pub struct ParseModeError(pub String);

impl FromStr for RenderMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pulse" => Ok(RenderMode::Pulse),
            "wordfire" => Ok(RenderMode::WordFire),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Grid dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub cols: usize,
    pub rows: usize,
}

impl GridSize {
    pub const COMPACT: GridSize = GridSize { cols: 40, rows: 12 };
    pub const FULL: GridSize = GridSize { cols: 80, rows: 24 };

    pub const fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    /// `FULL` when `full_view` is set, otherwise `COMPACT`.
    pub const fn for_view(full_view: bool) -> Self {
        if full_view {
            Self::FULL
        } else {
            Self::COMPACT
        }
    }

    /// Row the wordfire caption lands on, if the grid is tall enough.
    pub fn caption_row(&self) -> Option<usize> {
        if self.rows > 3 {
            Some(self.rows - 3)
        } else {
            None
        }
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::COMPACT
    }
}

/// An externally supplied effect trigger.
///
/// Only `intensity` and `text` influence rendering; the remaining fields are
/// carried through for callers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl EffectEvent {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = Some(intensity);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Intensity normalized into `[0, 1]`.
    ///
    /// Missing or NaN values fall back to [`DEFAULT_INTENSITY`].
    pub fn clamped_intensity(&self) -> f64 {
        match self.intensity {
            Some(v) if !v.is_nan() => v.clamp(0.0, 1.0),
            _ => DEFAULT_INTENSITY,
        }
    }

    /// Caption for wordfire mode.
    pub fn caption(&self) -> &str {
        self.text.as_deref().unwrap_or(DEFAULT_BANNER)
    }
}

/// Per-frame metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    /// Clamped intensity the frame was rendered with.
    pub intensity: f64,
    /// Tick the frame was computed at.
    pub tick: u64,
    pub mode: RenderMode,
}

/// One generated frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePayload {
    /// One string per row, each exactly `cols` characters wide.
    pub ascii_lines: Vec<String>,
    pub meta: FrameMeta,
}

impl FramePayload {
    pub fn rows(&self) -> usize {
        self.ascii_lines.len()
    }

    /// Width in characters of the first row (all rows share it).
    pub fn cols(&self) -> usize {
        self.ascii_lines
            .first()
            .map(|l| l.chars().count())
            .unwrap_or(0)
    }

    /// Rows joined with `\n`, ready to print.
    pub fn to_text(&self) -> String {
        self.ascii_lines.join("\n")
    }
}

/// Interactive display actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverAction {
    CycleSchedule,
    ToggleView,
    IntensityUp,
    IntensityDown,
    Pause,
}

impl DriverAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverAction::CycleSchedule => "cycleSchedule",
            DriverAction::ToggleView => "toggleView",
            DriverAction::IntensityUp => "intensityUp",
            DriverAction::IntensityDown => "intensityDown",
            DriverAction::Pause => "pause",
        }
    }
}
