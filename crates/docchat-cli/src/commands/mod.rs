pub mod ask;
pub mod chat;
pub mod export;

use std::io::Cursor;
use std::path::Path;

use anyhow::{bail, Context, Result};
use docchat_core::classify;
use docchat_core::document::{DocumentKind, DocumentStore, FileMetadata};
use docchat_core::session::SessionState;
use docchat_core::status::StatusSink;

use crate::runtime::Runtime;

/// Validate, classify, and extract one file into the pending-document store
///
/// Rejected files fail loudly; extraction errors do not, since the error
/// text itself becomes part of the document context.
pub async fn attach_file(
    runtime: &Runtime,
    session: &mut SessionState,
    path: &Path,
    new_docs: &mut DocumentStore,
    status: &dyn StatusSink,
) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let bytes = std::fs::read(path)
        .with_context(|| format!("could not read {}", path.display()))?;

    let mut cursor = Cursor::new(&bytes);
    let classification = classify::validate(&name, &mut cursor);
    if !classification.is_valid {
        bail!(
            "{name}: {}",
            classification
                .error
                .unwrap_or_else(|| "invalid file".to_string())
        );
    }
    let kind = match classification.kind {
        Some(kind) => kind,
        None => classify::detect_kind(Some(&name), None, &mut cursor),
    };

    let document = runtime.pipeline.process(&bytes, kind, &name, status).await;
    if let Some(e) = &document.error {
        eprintln!("  extraction problem for {name}: {e}");
    }
    new_docs.insert(name.clone(), document);
    session.file_metadata.insert(
        name.clone(),
        FileMetadata {
            name,
            kind: Some(kind),
        },
    );
    Ok(())
}

/// One-line description of a stored document
pub fn describe_document(name: &str, kind: Option<DocumentKind>, chars: usize) -> String {
    match kind {
        Some(kind) => format!("{name} ({kind}, {chars} chars extracted)"),
        None => format!("{name} ({chars} chars extracted)"),
    }
}
