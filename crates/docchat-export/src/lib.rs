// docchat-export: multi-strategy conversation export
//
// Three independently implemented PDF renderers are tried in strict order;
// the first success wins. If all three fail the conversation is rendered
// as markdown instead and tagged accordingly, so export never fails.

pub mod error;
pub mod fallback;
pub mod markdown;
pub mod primary;
pub mod secondary;

use chrono::{DateTime, Utc};
use docchat_core::message::ChatMessage;

pub use error::{ExportError, Result};
pub use fallback::FallbackPdfStrategy;
pub use markdown::export_chat_to_markdown;
pub use primary::PrimaryPdfStrategy;
pub use secondary::SecondaryPdfStrategy;

/// Format tag attached to an export artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Markdown,
}

impl ExportFormat {
    pub fn tag(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "markdown",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "md",
        }
    }
}

/// Export parameters
///
/// The timestamp is pinned at construction so re-exporting the same log
/// produces identical bytes.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub title: String,
    pub generated_at: DateTime<Utc>,
}

impl ExportOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            generated_at: Utc::now(),
        }
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new("Chat Conversation Export")
    }
}

/// One rendering strategy in the cascade
pub trait ExportStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, messages: &[ChatMessage], options: &ExportOptions) -> Result<Vec<u8>>;
}

/// Ordered strategy cascade with a markdown degradation floor
pub struct ChatExporter {
    strategies: Vec<Box<dyn ExportStrategy>>,
}

impl ChatExporter {
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(PrimaryPdfStrategy),
                Box::new(SecondaryPdfStrategy),
                Box::new(FallbackPdfStrategy),
            ],
        }
    }

    /// Replace the strategy list (tests and custom pipelines)
    pub fn with_strategies(strategies: Vec<Box<dyn ExportStrategy>>) -> Self {
        Self { strategies }
    }

    /// Export the conversation; never fails
    ///
    /// Strategies run in order and the first successful rendering is
    /// returned tagged `pdf`. Total failure degrades to a markdown
    /// transcript tagged `markdown`.
    pub fn export(&self, messages: &[ChatMessage], options: &ExportOptions) -> (Vec<u8>, ExportFormat) {
        for strategy in &self.strategies {
            match strategy.render(messages, options) {
                Ok(bytes) => {
                    tracing::debug!(strategy = strategy.name(), "export rendered");
                    return (bytes, ExportFormat::Pdf);
                }
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        "export strategy failed: {e}, trying next"
                    );
                }
            }
        }

        tracing::warn!("all export strategies failed, degrading to markdown");
        let text = export_chat_to_markdown(messages, options);
        (text.into_bytes(), ExportFormat::Markdown)
    }
}

impl Default for ChatExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic download name for an export artifact
pub fn export_file_name(options: &ExportOptions, format: ExportFormat) -> String {
    format!(
        "chat_export_{}.{}",
        options.generated_at.format("%Y%m%d_%H%M%S"),
        format.file_extension()
    )
}
