//! Driver configuration from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `SHOCK_FACTOR_TICK_MS` | 100 | Milliseconds between frames |
//! | `SHOCK_FACTOR_MODE` | `alternate` | `pulse`, `wordfire`, `alternate` or `random` |
//! | `SHOCK_FACTOR_FULL_VIEW` | off | `1`/`true` selects the 80x24 grid |
//! | `SHOCK_FACTOR_INTENSITY` | 0.8 | Effect strength, clamped to `[0, 1]` |
//! | `SHOCK_FACTOR_TEXT` | banner | Wordfire caption |
//! | `SHOCK_FACTOR_SEED` | clock | RNG seed |
//!
//! Unparseable values are logged and replaced by the default.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::driver::{Driver, ModeSchedule};
use crate::generator::FrameGenerator;
use crate::types::{EffectEvent, DEFAULT_INTENSITY, TICK_MS};
use crate::visualizer::Visualizer;

pub const ENV_TICK_MS: &str = "SHOCK_FACTOR_TICK_MS";
pub const ENV_MODE: &str = "SHOCK_FACTOR_MODE";
pub const ENV_FULL_VIEW: &str = "SHOCK_FACTOR_FULL_VIEW";
pub const ENV_INTENSITY: &str = "SHOCK_FACTOR_INTENSITY";
pub const ENV_TEXT: &str = "SHOCK_FACTOR_TEXT";
pub const ENV_SEED: &str = "SHOCK_FACTOR_SEED";

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub tick_ms: u64,
    pub schedule: ModeSchedule,
    pub full_view: bool,
    pub intensity: f64,
    pub text: Option<String>,
    /// `None` seeds from the wall clock.
    pub seed: Option<u32>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS as u64,
            schedule: ModeSchedule::default(),
            full_view: false,
            intensity: DEFAULT_INTENSITY,
            text: None,
            seed: None,
        }
    }
}

impl DriverConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map here).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let tick_ms = parse_or(ENV_TICK_MS, get(ENV_TICK_MS), defaults.tick_ms)
            .max(1);
        let schedule = parse_or(ENV_MODE, get(ENV_MODE), defaults.schedule);
        let intensity = parse_or(ENV_INTENSITY, get(ENV_INTENSITY), defaults.intensity);
        let seed = get(ENV_SEED).and_then(|v| match v.parse() {
            Ok(seed) => Some(seed),
            Err(_) => {
                warn!(key = ENV_SEED, value = %v, "invalid value, using clock seed");
                None
            }
        });
        let full_view = get(ENV_FULL_VIEW)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.full_view);

        Self {
            tick_ms,
            schedule,
            full_view,
            intensity: if intensity.is_nan() {
                DEFAULT_INTENSITY
            } else {
                intensity.clamp(0.0, 1.0)
            },
            // Caption text is taken verbatim; padding is part of the caption.
            text: lookup(ENV_TEXT).filter(|v| !v.is_empty()),
            seed,
        }
    }

    pub fn resolved_seed(&self) -> u32 {
        self.seed.unwrap_or_else(clock_seed)
    }

    /// The effect event the driver starts with.
    pub fn event(&self) -> EffectEvent {
        let event = EffectEvent::new("stage-fx", "shock-factor").with_intensity(self.intensity);
        match &self.text {
            Some(text) => event.with_text(text.clone()),
            None => event,
        }
    }

    pub fn build_driver(&self) -> Driver {
        let visualizer = Visualizer::with_generator(FrameGenerator::new(self.resolved_seed()));
        Driver::new(visualizer, self.event(), self.schedule).with_full_view(self.full_view)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => match v.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key, value = %v, "invalid value, using default");
                default
            }
        },
    }
}

fn clock_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
        .unwrap_or(1)
}
