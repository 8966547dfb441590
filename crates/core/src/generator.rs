//! Frame generator - turns an effect event into one ASCII frame
//!
//! The generator owns the animation tick. Every call renders a fresh
//! [`FramePayload`] at the current tick and then advances the tick by one, so
//! consecutive frames animate rather than repeat.
//!
//! Two render modes exist:
//!
//! - **Pulse**: a standing-wave band whose height undulates across the columns.
//!   Depends only on `(tick, column, row)` and never touches the RNG.
//! - **WordFire**: a flickering flame, hottest at the bottom row, with the
//!   event caption embossed on row `rows - 3`. Flame cells are drawn from the
//!   injected [`RandomSource`].

use std::f64::consts::TAU;

use crate::rng::{RandomSource, SimpleRng};
use crate::types::{
    EffectEvent, FrameMeta, FramePayload, GridSize, RenderMode, CAPTION_COLUMN, FLAME_GLYPHS,
    PULSE_RAMP,
};

/// Probability floor for a flame cell, so even a cold frame sparkles.
const FLAME_MIN_CHANCE: f64 = 0.01;
const FLAME_HEAT_SCALE: f64 = 0.06;

/// Stateful frame generator.
#[derive(Debug, Clone)]
pub struct FrameGenerator<R = SimpleRng> {
    tick: u64,
    rng: R,
}

impl FrameGenerator<SimpleRng> {
    /// Generator starting at tick 0 with a [`SimpleRng`] seeded from `seed`.
    pub fn new(seed: u32) -> Self {
        Self::with_rng(SimpleRng::new(seed))
    }
}

impl Default for FrameGenerator<SimpleRng> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<R: RandomSource> FrameGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { tick: 0, rng }
    }

    /// Start counting from `tick` instead of 0.
    pub fn starting_at(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    /// Tick the next frame will be rendered at.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Render one frame: 80x24 when `full_view`, 40x12 otherwise.
    pub fn generate_frame(
        &mut self,
        event: &EffectEvent,
        mode: RenderMode,
        full_view: bool,
    ) -> FramePayload {
        self.generate_frame_sized(event, mode, GridSize::for_view(full_view))
    }

    /// Render one frame into an arbitrary grid.
    pub fn generate_frame_sized(
        &mut self,
        event: &EffectEvent,
        mode: RenderMode,
        size: GridSize,
    ) -> FramePayload {
        let intensity = event.clamped_intensity();
        let tick = self.tick;

        let ascii_lines = match mode {
            RenderMode::Pulse => render_pulse(tick, size),
            RenderMode::WordFire => {
                render_wordfire(tick, intensity, event.caption(), size, &mut self.rng)
            }
        };

        self.tick += 1;

        FramePayload {
            ascii_lines,
            meta: FrameMeta {
                intensity,
                tick,
                mode,
            },
        }
    }
}

/// Pulse band for `tick`. Pure.
pub fn render_pulse(tick: u64, size: GridSize) -> Vec<String> {
    let GridSize { cols, rows } = size;
    let t = tick as f64;
    let mid = (rows / 2) as i64;

    // Band half-height and glyph depend only on the column.
    let columns: Vec<(i64, char)> = (0..cols)
        .map(|c| {
            let cf = c as f64;
            let offset = ((cf / cols as f64) * TAU + t / 6.0).sin();
            let half = (offset.abs() * mid as f64).floor() as i64;
            let level = ((cf / 8.0 + t / 10.0).sin().abs() * (PULSE_RAMP.len() - 1) as f64)
                .floor() as usize;
            (half, PULSE_RAMP[level.min(PULSE_RAMP.len() - 1)])
        })
        .collect();

    (0..rows as i64)
        .map(|r| {
            columns
                .iter()
                .map(|&(half, glyph)| {
                    if r > mid - half && r < mid + half {
                        glyph
                    } else {
                        ' '
                    }
                })
                .collect()
        })
        .collect()
}

/// Deterministic brightness term of the wordfire flame at `tick`.
///
/// `intensity` is expected to be clamped already.
pub fn flame_intensity(tick: u64, intensity: f64) -> f64 {
    (((tick as f64) / 5.0).sin() + 1.0) / 2.0 * intensity
}

/// Wordfire flame with caption for `tick`.
pub fn render_wordfire<R: RandomSource>(
    tick: u64,
    intensity: f64,
    caption: &str,
    size: GridSize,
    rng: &mut R,
) -> Vec<String> {
    let GridSize { cols, rows } = size;
    let flame = flame_intensity(tick, intensity);
    let caption: Vec<char> = caption.chars().collect();
    let caption_row = size.caption_row();
    let caption_end = CAPTION_COLUMN + caption.len();

    let mut lines = Vec::with_capacity(rows);
    for r in 0..rows {
        let heat = flame * ((rows - r) as f64 / rows as f64).max(0.0);
        let chance = (heat * FLAME_HEAT_SCALE).max(FLAME_MIN_CHANCE);
        let on_caption_row = caption_row == Some(r);

        let mut line = String::with_capacity(cols * 3);
        for c in 0..cols {
            if on_caption_row && (CAPTION_COLUMN..caption_end).contains(&c) {
                line.push(caption[c - CAPTION_COLUMN]);
            } else if rng.chance(chance) {
                line.push(FLAME_GLYPHS[rng.next_index(FLAME_GLYPHS.len())]);
            } else {
                line.push(' ');
            }
        }
        lines.push(line);
    }
    lines
}
