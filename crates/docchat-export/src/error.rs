// Error types for export strategies

use thiserror::Error;

/// Result type alias for rendering operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors a single export strategy can fail with
///
/// A strategy failure is not terminal for the export as a whole; the
/// cascade moves on to the next strategy.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Rendering produced no usable output
    #[error("render error: {0}")]
    Render(String),

    /// PDF document construction failed
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Writing the finished document failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A preprocessing pattern failed to compile
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ExportError {
    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        ExportError::Render(msg.into())
    }
}
