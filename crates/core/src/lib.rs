//! Core effect logic module - frame generation and delivery
//!
//! This crate contains the Shock Factor pipeline with **no dependencies** on
//! terminals or networking:
//!
//! - **Deterministic where it matters**: pulse frames depend only on the tick;
//!   wordfire frames depend on the tick and an injected, seedable RNG
//! - **Explicit state**: the tick lives in a [`FrameGenerator`] value, so
//!   independent generators never interfere
//! - **Isolated consumers**: a failing frame subscriber cannot starve the others
//!
//! # Module Structure
//!
//! - [`generator`]: pulse and wordfire frame rendering, owns the tick
//! - [`rng`]: [`RandomSource`] trait and the seeded [`SimpleRng`]
//! - [`bus`]: named-event publish/subscribe with per-handler failure boundaries
//! - [`visualizer`]: generator + bus, `handle_effect_event`
//! - [`driver`]: mode schedules and fixed-cadence stepping
//! - [`config`]: driver configuration from the environment
//!
//! # Example
//!
//! ```
//! use shock_factor_core::{Visualizer, FRAME_EVENT};
//! use shock_factor_types::{EffectEvent, RenderMode};
//!
//! let mut vis = Visualizer::new(42);
//! vis.on_frame(|frame| {
//!     assert_eq!(frame.ascii_lines.len(), 12);
//!     Ok(())
//! });
//!
//! let event = EffectEvent::new("demo", "pulse").with_intensity(0.8);
//! vis.handle_effect_event(&event, RenderMode::Pulse, false);
//! assert_eq!(vis.generator().tick(), 1);
//! # let _ = FRAME_EVENT;
//! ```

pub mod bus;
pub mod config;
pub mod driver;
pub mod generator;
pub mod rng;
pub mod visualizer;

pub use shock_factor_types as types;

pub use bus::{EmitReport, EventBus, HandlerError, HandlerResult, SubscriptionId, FRAME_EVENT};
pub use config::DriverConfig;
pub use driver::{Driver, ModeSchedule, ParseScheduleError};
pub use generator::{flame_intensity, render_pulse, render_wordfire, FrameGenerator};
pub use rng::{RandomSource, SimpleRng};
pub use visualizer::Visualizer;
