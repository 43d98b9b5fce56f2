//! Memory error types.

use infichat_core::ConfigError;
use thiserror::Error;

/// Result type for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Memory errors.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Missing credential or unusable local configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Memory API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The service answered with a body we could not use.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ConfigError> for MemoryError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl MemoryError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}
