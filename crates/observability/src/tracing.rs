//! Tracing/logging initialization.
//!
//! JSON lines with timestamps, filtered through `RUST_LOG` when present.

use tracing_subscriber::EnvFilter;

pub fn default_directive(is_debug: bool) -> &'static str {
    if is_debug { "debug" } else { "info" }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init()
        .is_ok()
}
