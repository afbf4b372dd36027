//! Tracing subscriber setup.
//!
//! Logs go to stderr; stdout carries the IPC bridge.

use crate::config::{ConfigError, RuntimeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &RuntimeConfig) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|_| ConfigError::InvalidLogLevel(config.log_level.clone()))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    // A subscriber installed earlier (tests, embedding hosts) is kept.
    if let Err(err) = result {
        tracing::debug!(error = %err, "Global subscriber already set");
    }
    Ok(())
}
