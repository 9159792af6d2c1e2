// Document domain types
//
// These types represent an uploaded file's classification and the outcome of
// text extraction. Used by the pipeline, context assembler, and turn driver.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of document accepted by the ingestion pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
    Text,
    Yaml,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Pdf => write!(f, "pdf"),
            DocumentKind::Image => write!(f, "image"),
            DocumentKind::Text => write!(f, "text"),
            DocumentKind::Yaml => write!(f, "yaml"),
        }
    }
}

/// Outcome of validating an uploaded file against its declared extension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DocumentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Classification {
    pub fn valid(kind: DocumentKind) -> Self {
        Self {
            is_valid: true,
            kind: Some(kind),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            kind: None,
            error: Some(error.into()),
        }
    }
}

/// Shape of the OCR response the extracted text came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractedFormat {
    /// `pages[].markdown`, concatenated
    Markdown,
    /// Top-level `text` field
    Text,
    /// `elements[].text`, concatenated
    Elements,
    /// Top-level `content` field
    Content,
    /// Recovered by recursive field extraction
    Extracted,
    /// YAML passthrough (no OCR call)
    Yaml,
    /// No recognizable shape; raw snapshot retained for diagnostics
    Unknown,
}

impl std::fmt::Display for ExtractedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExtractedFormat::Markdown => "markdown",
            ExtractedFormat::Text => "text",
            ExtractedFormat::Elements => "elements",
            ExtractedFormat::Content => "content",
            ExtractedFormat::Extracted => "extracted",
            ExtractedFormat::Yaml => "yaml",
            ExtractedFormat::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Result of processing one document through the extraction pipeline
///
/// Invariant: when `error` is unset, `text` holds the extracted content
/// (possibly empty for a blank but valid file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    #[serde(default)]
    pub text: String,
    pub format: ExtractedFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Serialized snapshot of the raw OCR response, kept for diagnostics
    /// when the normalizer could not recognize the shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
}

impl ExtractedDocument {
    pub fn new(text: impl Into<String>, format: ExtractedFormat) -> Self {
        Self {
            text: text.into(),
            format,
            error: None,
            raw_response: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            format: ExtractedFormat::Unknown,
            error: Some(msg.into()),
            raw_response: None,
        }
    }

    pub fn with_raw_response(mut self, raw: serde_json::Value) -> Self {
        self.raw_response = Some(raw);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Processed documents keyed by display name
///
/// Ordered map so prompt assembly and display are deterministic.
pub type DocumentStore = BTreeMap<String, ExtractedDocument>;

/// Metadata recorded for a remote-side file, used to resolve citations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DocumentKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_document_invariant() {
        let doc = ExtractedDocument::new("hello", ExtractedFormat::Text);
        assert!(!doc.is_error());
        assert_eq!(doc.text, "hello");

        let err = ExtractedDocument::error("bad response");
        assert!(err.is_error());
        assert!(err.text.is_empty());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(DocumentKind::Pdf.to_string(), "pdf");
        assert_eq!(DocumentKind::Yaml.to_string(), "yaml");
    }
}
