//! Terminal input module.
//!
//! Maps `crossterm` key events into [`crate::types::DriverAction`] for the
//! interactive display. Holding a key is fine: terminal auto-repeat simply
//! produces more intensity steps.

pub mod map;

pub use shock_factor_types as types;

pub use map::{handle_key_event, should_quit};
