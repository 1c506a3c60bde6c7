use crate::config::AppConfig;
use crate::logging::{file_logging_enabled, log_file_path, LogWriter, LOG_MAX_BYTES};
use anyhow::{Context, Result};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Install the global subscriber: human-readable events on stderr at `--log-level`, plus
/// JSON lines with UTC RFC 3339 timestamps in a size-capped file when `--logs` is on.
pub fn init_tracing(config: &AppConfig) -> Result<()> {
    let level = config.log_level.as_filter();
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level);

    let file_layer = if file_logging_enabled(config) {
        let path = log_file_path();
        let writer = LogWriter::open(&path, LOG_MAX_BYTES)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_writer(Mutex::new(writer))
                .with_current_span(false)
                .with_span_list(false)
                .with_filter(level),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("tracing subscriber already installed")?;
    if file_logging_enabled(config) {
        tracing::debug!(path = %log_file_path().display(), "file logging enabled");
    }
    Ok(())
}
