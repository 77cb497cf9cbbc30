// Domain errors - Error types for the domain layer

use thiserror::Error;

/// Domain-specific error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// External tool is not installed or not on PATH
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
    /// External tool ran but reported failure
    #[error("{tool} failed (exit code {exit_code:?}): {message}")]
    ToolFailed {
        tool: String,
        message: String,
        exit_code: Option<i32>,
    },
    /// Operation exceeded its timeout
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },
    /// Remote collaborator is unreachable or refused the request
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Remote collaborator answered with something we cannot use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(String),
    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    /// Processing error
    #[error("Processing error: {0}")]
    ProcessingError(String),
}

impl DomainError {
    /// Whether a retry of the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DomainError::Timeout { .. }
                | DomainError::ToolFailed { .. }
                | DomainError::ServiceUnavailable(_)
        )
    }

    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>, exit_code: Option<i32>) -> Self {
        DomainError::ToolFailed {
            tool: tool.into(),
            message: message.into(),
            exit_code,
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => DomainError::FileNotFound(err.to_string()),
            _ => DomainError::Io(err.to_string()),
        }
    }
}
