// Error types for the ingestion and context-assembly core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in the ingestion core
#[derive(Debug, Error)]
pub enum CoreError {
    /// File failed validation (bad extension, corrupt content)
    #[error("Validation error: {0}")]
    Validation(String),

    /// OCR response could not be interpreted
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Configuration error (missing key, bad value)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error while inspecting an uploaded stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    /// Create an extraction error
    pub fn extraction(msg: impl Into<String>) -> Self {
        CoreError::Extraction(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        CoreError::Configuration(msg.into())
    }
}
