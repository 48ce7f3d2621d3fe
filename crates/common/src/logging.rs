//! Logging and tracing initialization.

use std::sync::Arc;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber from the logging configuration.
///
/// Honors the configured level filter (overridable via `RUST_LOG`), JSON
/// output, and an optional append-mode log file. Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let log_file = config.file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    let builder = fmt().with_env_filter(filter).with_target(true);

    match (log_file, config.json) {
        (Some(file), true) => builder.json().with_writer(Arc::new(file)).try_init(),
        (Some(file), false) => builder
            .with_ansi(false)
            .with_writer(Arc::new(file))
            .try_init(),
        (None, true) => builder.json().try_init(),
        (None, false) => builder.try_init(),
    }
    .ok();
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
