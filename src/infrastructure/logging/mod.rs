//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber: JSON or
//! pretty formatting driven by configuration, with `RUST_LOG` able to
//! override the configured level.

use tracing_subscriber::EnvFilter;

use crate::domain::models::LoggingConfig;

/// Initialize the global tracing subscriber from configuration.
///
/// Safe to call more than once; later calls are no-ops so tests can all
/// request logging.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}
