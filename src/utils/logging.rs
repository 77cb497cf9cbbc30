//! Logging configuration and output formatting

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::domain::errors::DomainError;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Pretty,
    /// JSON format for structured logging
    Json,
}

/// Build the filter: `RUST_LOG` wins, otherwise the requested level
pub fn build_filter(level: &str) -> Result<EnvFilter, DomainError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| DomainError::BadArgs(format!("Invalid log level '{}': {}", level, e))),
    }
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), DomainError> {
    let filter = build_filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(version = env!("CARGO_PKG_VERSION"), ?format, "Logging initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_levels() {
        for level in ["error", "warn", "info", "debug", "trace", "scenesplit_cli=debug"] {
            assert!(build_filter(level).is_ok(), "{} should parse", level);
        }
    }

    #[test]
    fn test_init_twice_is_harmless() {
        assert!(init_logging("info", LogFormat::Pretty).is_ok());
        assert!(init_logging("debug", LogFormat::Json).is_ok());
    }
}
