//! Tracing/logging initialization.
//!
//! Structured JSON logs, filtered via `RUST_LOG`. The transition pipeline
//! logs delivery failures (bus publication, notification enqueue) at warn,
//! so a quiet deployment should keep at least that level enabled.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
