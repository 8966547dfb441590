//! Shock Factor (workspace facade crate).
//!
//! Re-exports the workspace crates as `shock_factor::{core,adapter,term,input,types}`
//! and hosts the logging setup shared by the binaries.

pub mod logging;

pub use shock_factor_adapter as adapter;
pub use shock_factor_core as core;
pub use shock_factor_input as input;
pub use shock_factor_term as term;
pub use shock_factor_types as types;
