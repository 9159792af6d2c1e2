// Error types for the conversation API client

use thiserror::Error;

/// Result type alias for conversation API operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Errors that can occur while talking to the conversation service
#[derive(Debug, Error)]
pub enum AssistantError {
    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response was missing data the driver needs
    #[error("Missing data in response: {0}")]
    MissingData(String),
}

impl AssistantError {
    /// Create a missing-data error
    pub fn missing(msg: impl Into<String>) -> Self {
        AssistantError::MissingData(msg.into())
    }
}
