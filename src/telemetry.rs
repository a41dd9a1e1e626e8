//! Process-wide tracing subscriber set-up.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// `logging.level` is not a valid filter directive.
    #[error("invalid log filter `{directive}`: {source}")]
    InvalidFilter {
        /// Rejected directive.
        directive: String,
        /// Parser failure.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Builds the event filter. `RUST_LOG` wins over the configured level.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when `RUST_LOG` is unset and the
/// configured level does not parse.
pub fn filter(settings: &LoggingSettings) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(&settings.level).map_err(|source| TelemetryError::InvalidFilter {
            directive: settings.level.clone(),
            source,
        })
    })
}

/// Installs the global subscriber, as JSON lines when configured.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init(settings: &LoggingSettings) -> Result<(), TelemetryError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(settings)?)
        .with_target(true);
    let installed = if settings.json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    installed.map_err(|err| TelemetryError::Install(err.to_string()))
}
