// Docchat ingestion core
//
// Domain types and the pure parts of the document-ingestion-and-context
// pipeline: file classification/validation, OCR response normalization,
// context assembly, session state, and the retry/status/config seams the
// remote-facing crates build on.
//
// Key design decisions:
// - Validation operates on Read + Seek streams and restores the cursor on
//   every exit path (the same handle is inspected by several stages)
// - Normalization is total: any response shape yields an ExtractedDocument,
//   never a panic or an uncaught error
// - Session state is an owned struct passed by reference, one per session;
//   no ambient globals
// - Retry behavior is an explicit RetryPolicy value consulted by callers

pub mod classify;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod message;
pub mod normalize;
pub mod retry;
pub mod session;
pub mod status;

// Re-exports for convenience
pub use classify::{detect_kind, validate, ALLOWED_EXTENSIONS};
pub use config::{Config, ConfigProvider, EnvProvider};
pub use context::{build_prompt, DOC_TEXT_LIMIT};
pub use document::{
    Classification, DocumentKind, DocumentStore, ExtractedDocument, ExtractedFormat, FileMetadata,
};
pub use error::{CoreError, Result};
pub use message::{ChatMessage, Role};
pub use normalize::{extract_all_text_fields, normalize};
pub use retry::{BackoffSchedule, RetryPolicy};
pub use session::{ClearedResources, SessionState};
pub use status::{NullStatusSink, Phase, StatusSink, TracingStatusSink};
