//! Terminal display module.
//!
//! Renders Shock Factor frames the way the stage panel shows them: a titled,
//! bordered box of green glyphs with a status line underneath. It avoids
//! widget toolkits and instead renders into a simple framebuffer that is
//! diffed and flushed to the terminal.
//!
//! Goals:
//! - Keep frame generation (`core`) free of terminal concerns
//! - Repaint only what changed between frames
//! - Clip gracefully when the terminal is smaller than the frame

pub mod fb;
pub mod frame_view;
pub mod renderer;

pub use shock_factor_types as types;

pub use fb::{Cell, CellStyle, FrameBuffer, Rgb};
pub use frame_view::{AnchorY, FrameView, StatusView, Viewport, PLACEHOLDER, TITLE};
pub use renderer::{encode_diff_into, encode_full_into, encode_plain_into, TerminalRenderer};
