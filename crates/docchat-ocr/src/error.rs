// Error types for the OCR client

use thiserror::Error;

/// Result type alias for OCR operations
pub type Result<T> = std::result::Result<T, OcrError>;

/// Errors that can occur while talking to the OCR service
///
/// These stay internal to the crate: the pipeline converts every failure
/// into an error-carrying `ExtractedDocument` rather than raising.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Could not build the HTTP client
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Request timed out at the network level
    #[error("Timeout contacting the OCR API")]
    Timeout,

    /// Other network-level failure
    #[error("Network error: {0}")]
    Network(String),
}
