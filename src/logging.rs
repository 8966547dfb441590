//! Tracing subscriber setup for the binaries.

use tracing_subscriber::EnvFilter;

pub const ENV_LOG_PATH: &str = "SHOCK_FACTOR_LOG_PATH";

/// Where log lines go when `SHOCK_FACTOR_LOG_PATH` is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Stderr,
    /// Discard; the interactive display owns the terminal.
    Discard,
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging(fallback: Fallback) {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var(ENV_LOG_PATH) {
        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(file)
                .init();
            return;
        }
    }

    match fallback {
        Fallback::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init(),
        Fallback::Discard => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .init(),
    }
}
