//! Tracing subscriber setup: single-line JSON for CI, readable text locally.

use crate::config::{LogFormat, LoggingSettings};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Later calls are no-ops, so every test
/// binary can call this from its own setup.
pub fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match settings.format {
        LogFormat::Json => builder
            .json()
            .with_current_span(false)
            .flatten_event(true)
            .try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_ok() {
        tracing::debug!(format = ?settings.format, level = %settings.level, "Logging initialised");
    }
}
