//! Process-wide tracing setup.

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Initialize process-wide logging.
///
/// `is_debug` lowers the default level to `debug`; `RUST_LOG` still wins when
/// set. Safe to call multiple times; later calls are no-ops.
pub fn init(is_debug: bool) {
    tracing::init(tracing::default_directive(is_debug));
}
