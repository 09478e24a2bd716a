//! Logging setup for applications embedding the store.

use tracing_subscriber::EnvFilter;

/// Installs a stderr `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`). Later calls are no-ops.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with a caller-chosen default directive.
pub fn init_logging_with_default(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
