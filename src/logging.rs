//! Tracing Subscriber Setup
//!
//! The library only emits `tracing` events. A subscriber is installed when a
//! runtime is created, unless the host process already installed one.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "GRIDBRIDGE_LOG";

/// Build the filter: `GRIDBRIDGE_LOG` if set and valid, else the configured level.
pub fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber. Returns `false` when one was already set,
/// in which case the existing one is kept.
pub fn init(config: &LoggingConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.is_ok()
}
