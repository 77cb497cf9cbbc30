//! Error handling module for SceneSplit

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for SceneSplit operations at the library boundary
#[derive(Error, Debug)]
pub enum SceneSplitError {
    /// Configuration could not be loaded or is inconsistent
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Input path not found or contains no videos
    #[error("No input videos found: {path}")]
    NoInputs { path: String },

    /// Output artifact (manifest or run report) could not be written
    #[error("Failed to write output file: {message}")]
    OutputError { message: String },

    /// Error raised by a pipeline stage
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias for SceneSplit operations
pub type SceneSplitResult<T> = std::result::Result<T, SceneSplitError>;
