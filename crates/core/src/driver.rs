//! Driver - fixed-cadence stepping of the visualizer
//!
//! The driver holds the "current" effect event and decides, step by step,
//! which render mode to use. It knows nothing about clocks: callers invoke
//! [`Driver::step`] every [`TICK_MS`](crate::types::TICK_MS) milliseconds.

use std::fmt;
use std::str::FromStr;

use crate::rng::{RandomSource, SimpleRng};
use crate::types::{DriverAction, EffectEvent, RenderMode};
use crate::visualizer::Visualizer;

/// Frames per mode for the alternating demo schedule.
pub const DEFAULT_ALTERNATE_PERIOD: u64 = 10;

/// Intensity change per key press.
pub const INTENSITY_STEP: f64 = 0.1;

/// Policy for choosing the render mode of each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSchedule {
    /// Always the same mode.
    Fixed(RenderMode),
    /// `period` pulse frames, then `period` wordfire frames, repeating.
    Alternate { period: u64 },
    /// Coin flip per step.
    Random,
}

impl Default for ModeSchedule {
    fn default() -> Self {
        ModeSchedule::Alternate {
            period: DEFAULT_ALTERNATE_PERIOD,
        }
    }
}

impl ModeSchedule {
    pub fn mode_for<R: RandomSource>(&self, step: u64, rng: &mut R) -> RenderMode {
        match *self {
            ModeSchedule::Fixed(mode) => mode,
            ModeSchedule::Alternate { period } => {
                let period = period.max(1);
                if step % (period * 2) < period {
                    RenderMode::Pulse
                } else {
                    RenderMode::WordFire
                }
            }
            ModeSchedule::Random => {
                if rng.chance(0.5) {
                    RenderMode::Pulse
                } else {
                    RenderMode::WordFire
                }
            }
        }
    }

    /// Next schedule in the interactive cycle:
    /// alternate -> pulse -> wordfire -> random -> alternate.
    pub fn cycled(&self) -> Self {
        match *self {
            ModeSchedule::Alternate { .. } => ModeSchedule::Fixed(RenderMode::Pulse),
            ModeSchedule::Fixed(RenderMode::Pulse) => ModeSchedule::Fixed(RenderMode::WordFire),
            ModeSchedule::Fixed(RenderMode::WordFire) => ModeSchedule::Random,
            ModeSchedule::Random => ModeSchedule::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModeSchedule::Fixed(mode) => mode.as_str(),
            ModeSchedule::Alternate { .. } => "alternate",
            ModeSchedule::Random => "random",
        }
    }
}

impl fmt::Display for ModeSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RenderMode> for ModeSchedule {
    fn from(mode: RenderMode) -> Self {
        ModeSchedule::Fixed(mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown schedule `{0}` (expected pulse, wordfire, alternate or random)")]
pub struct ParseScheduleError(pub String);

impl FromStr for ModeSchedule {
    type Err = ParseScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alternate" => Ok(ModeSchedule::default()),
            "random" => Ok(ModeSchedule::Random),
            other => other
                .parse::<RenderMode>()
                .map(ModeSchedule::Fixed)
                .map_err(|_| ParseScheduleError(s.to_string())),
        }
    }
}

/// Steps a [`Visualizer`] with a current event and schedule.
#[derive(Debug)]
pub struct Driver<R = SimpleRng> {
    visualizer: Visualizer<R>,
    event: EffectEvent,
    schedule: ModeSchedule,
    full_view: bool,
    paused: bool,
    steps: u64,
}

impl<R: RandomSource> Driver<R> {
    pub fn new(visualizer: Visualizer<R>, event: EffectEvent, schedule: ModeSchedule) -> Self {
        Self {
            visualizer,
            event,
            schedule,
            full_view: false,
            paused: false,
            steps: 0,
        }
    }

    pub fn with_full_view(mut self, full_view: bool) -> Self {
        self.full_view = full_view;
        self
    }

    /// Emit one frame. Returns the mode used, or `None` while paused.
    pub fn step(&mut self) -> Option<RenderMode> {
        if self.paused {
            return None;
        }
        let rng = self.visualizer.generator_mut().rng_mut();
        let mode = self.schedule.mode_for(self.steps, rng);
        self.visualizer
            .handle_effect_event(&self.event, mode, self.full_view);
        self.steps += 1;
        Some(mode)
    }

    pub fn apply_action(&mut self, action: DriverAction) {
        match action {
            DriverAction::CycleSchedule => self.schedule = self.schedule.cycled(),
            DriverAction::ToggleView => self.full_view = !self.full_view,
            DriverAction::IntensityUp => self.adjust_intensity(INTENSITY_STEP),
            DriverAction::IntensityDown => self.adjust_intensity(-INTENSITY_STEP),
            DriverAction::Pause => self.paused = !self.paused,
        }
    }

    /// Nudge the current event's intensity, keeping it in `[0, 1]`.
    pub fn adjust_intensity(&mut self, delta: f64) {
        let next = (self.event.clamped_intensity() + delta).clamp(0.0, 1.0);
        // Round to hundredths so repeated steps don't drift.
        self.event.intensity = Some((next * 100.0).round() / 100.0);
    }

    pub fn event(&self) -> &EffectEvent {
        &self.event
    }

    pub fn set_event(&mut self, event: EffectEvent) {
        self.event = event;
    }

    pub fn schedule(&self) -> ModeSchedule {
        self.schedule
    }

    pub fn set_schedule(&mut self, schedule: ModeSchedule) {
        self.schedule = schedule;
    }

    pub fn full_view(&self) -> bool {
        self.full_view
    }

    pub fn set_full_view(&mut self, full_view: bool) {
        self.full_view = full_view;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn visualizer(&self) -> &Visualizer<R> {
        &self.visualizer
    }

    pub fn visualizer_mut(&mut self) -> &mut Visualizer<R> {
        &mut self.visualizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(schedule: ModeSchedule) -> Driver {
        Driver::new(Visualizer::new(1), EffectEvent::new("demo", "pulse"), schedule)
    }

    #[test]
    fn test_alternate_matches_demo_cadence() {
        let mut rng = SimpleRng::new(1);
        let schedule = ModeSchedule::default();
        for step in 0..10 {
            assert_eq!(schedule.mode_for(step, &mut rng), RenderMode::Pulse);
        }
        for step in 10..20 {
            assert_eq!(schedule.mode_for(step, &mut rng), RenderMode::WordFire);
        }
        assert_eq!(schedule.mode_for(20, &mut rng), RenderMode::Pulse);
    }

    #[test]
    fn test_alternate_zero_period_does_not_divide_by_zero() {
        let mut rng = SimpleRng::new(1);
        let schedule = ModeSchedule::Alternate { period: 0 };
        assert_eq!(schedule.mode_for(0, &mut rng), RenderMode::Pulse);
        assert_eq!(schedule.mode_for(1, &mut rng), RenderMode::WordFire);
    }

    #[test]
    fn test_random_schedule_uses_both_modes() {
        let mut rng = SimpleRng::new(9);
        let modes: Vec<_> = (0..64)
            .map(|s| ModeSchedule::Random.mode_for(s, &mut rng))
            .collect();
        assert!(modes.contains(&RenderMode::Pulse));
        assert!(modes.contains(&RenderMode::WordFire));
    }

    #[test]
    fn test_schedule_cycle_returns_to_start() {
        let start = ModeSchedule::default();
        let mut s = start;
        let mut names = Vec::new();
        for _ in 0..4 {
            s = s.cycled();
            names.push(s.as_str());
        }
        assert_eq!(names, vec!["pulse", "wordfire", "random", "alternate"]);
        assert_eq!(s, start);
    }

    #[test]
    fn test_schedule_parse() {
        assert_eq!("random".parse::<ModeSchedule>(), Ok(ModeSchedule::Random));
        assert_eq!(
            "WORDFIRE".parse::<ModeSchedule>(),
            Ok(ModeSchedule::Fixed(RenderMode::WordFire))
        );
        assert!("strobe".parse::<ModeSchedule>().is_err());
    }

    #[test]
    fn test_step_counts_and_pauses() {
        let mut d = driver(ModeSchedule::Fixed(RenderMode::WordFire));
        assert_eq!(d.step(), Some(RenderMode::WordFire));
        d.apply_action(DriverAction::Pause);
        assert_eq!(d.step(), None);
        assert_eq!(d.steps(), 1);
        assert_eq!(d.visualizer().generator().tick(), 1);
        d.apply_action(DriverAction::Pause);
        assert!(d.step().is_some());
        assert_eq!(d.steps(), 2);
    }

    #[test]
    fn test_intensity_adjustment_is_clamped() {
        let mut d = driver(ModeSchedule::default());
        d.apply_action(DriverAction::IntensityUp);
        d.apply_action(DriverAction::IntensityUp);
        d.apply_action(DriverAction::IntensityUp);
        assert_eq!(d.event().intensity, Some(1.0));
        for _ in 0..15 {
            d.apply_action(DriverAction::IntensityDown);
        }
        assert_eq!(d.event().intensity, Some(0.0));
    }

    #[test]
    fn test_toggle_view() {
        let mut d = driver(ModeSchedule::default());
        assert!(!d.full_view());
        d.apply_action(DriverAction::ToggleView);
        assert!(d.full_view());
    }
}
