//! Tracing subscriber setup for processes hosting the queue.
//!
//! The queue itself only emits `tracing` events; hosts that have no subscriber
//! of their own can install one from [`LoggingConfig`].

use crate::config::LoggingConfig;
use crate::queue_engine::QueueError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the event filter: `RUST_LOG` when set, otherwise the configured level
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, QueueError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| QueueError::Configuration {
            message: format!("Invalid logging.level '{}': {}", config.level, e),
        }),
    }
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// Returns error if the level is invalid or a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), QueueError> {
    let registry = tracing_subscriber::registry().with(build_filter(config)?);

    let result = if config.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| QueueError::Configuration {
        message: format!("Failed to install tracing subscriber: {}", e),
    })
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
