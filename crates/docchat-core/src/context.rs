// Context assembly
//
// Merges newly processed documents into the session's document store and
// appends their extracted text to the user's prompt, bounded per document so
// the remote context window is not exhausted.

use serde_json::Value;

use crate::document::{DocumentStore, ExtractedDocument};

/// Per-document cap on text injected into the prompt
pub const DOC_TEXT_LIMIT: usize = 5000;

const CONTEXT_HEADER: &str = "\n\n### Context from processed documents:\n\n";

/// Merge new documents into the session store and build the enriched prompt
///
/// New entries overwrite same-named session entries; the merge is written
/// back before prompt construction so future turns see cumulative context.
/// The base prompt goes out unmodified when no document contributes content.
pub fn build_prompt(
    base_prompt: &str,
    session_docs: &mut DocumentStore,
    new_docs: &DocumentStore,
) -> String {
    for (name, doc) in new_docs {
        session_docs.insert(name.clone(), doc.clone());
    }

    if session_docs.is_empty() {
        return base_prompt.to_string();
    }

    let mut context = String::from(CONTEXT_HEADER);
    for (name, doc) in session_docs.iter() {
        context.push_str(&render_document(name, doc));
    }

    if context.len() > CONTEXT_HEADER.len() {
        tracing::info!(
            documents = session_docs.len(),
            prompt_chars = base_prompt.len() + context.len(),
            "prompt enriched with document context"
        );
        format!("{base_prompt}{context}")
    } else {
        tracing::warn!("no usable text found in any context document");
        base_prompt.to_string()
    }
}

fn render_document(name: &str, doc: &ExtractedDocument) -> String {
    if doc.error.is_none() && !doc.text.is_empty() {
        return format!("-- Document: {name} --\n{}\n\n", truncate(&doc.text));
    }

    if let Some(error) = &doc.error {
        // A failed extraction may still carry a raw response with usable text
        if let Some(text) = doc
            .raw_response
            .as_ref()
            .and_then(|raw| raw.get("text"))
            .and_then(Value::as_str)
        {
            return format!("-- Document: {name} --\n{}\n\n", truncate(text));
        }
        return format!("-- Document: {name} -- (Error extracting text: {error})\n\n");
    }

    format!("-- Document: {name} -- (No text could be extracted)\n\n")
}

fn truncate(text: &str) -> String {
    if text.chars().count() > DOC_TEXT_LIMIT {
        let cut: String = text.chars().take(DOC_TEXT_LIMIT).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ExtractedFormat;
    use serde_json::json;

    fn doc(text: &str) -> ExtractedDocument {
        ExtractedDocument::new(text, ExtractedFormat::Text)
    }

    #[test]
    fn test_merge_keeps_both_stores() {
        let mut session = DocumentStore::new();
        session.insert("docA".into(), doc("short"));
        let mut new = DocumentStore::new();
        new.insert("docB".into(), doc("short2"));

        let prompt = build_prompt("question", &mut session, &new);
        assert!(session.contains_key("docA"));
        assert!(session.contains_key("docB"));
        assert!(prompt.contains("-- Document: docA --"));
        assert!(prompt.contains("-- Document: docB --"));
        assert!(prompt.starts_with("question"));
    }

    #[test]
    fn test_new_overwrites_session_entry() {
        let mut session = DocumentStore::new();
        session.insert("doc".into(), doc("old"));
        let mut new = DocumentStore::new();
        new.insert("doc".into(), doc("fresh"));

        let prompt = build_prompt("q", &mut session, &new);
        assert!(prompt.contains("fresh"));
        assert!(!prompt.contains("old"));
        assert_eq!(session.get("doc").unwrap().text, "fresh");
    }

    #[test]
    fn test_truncation_with_ellipsis() {
        let mut session = DocumentStore::new();
        let new = DocumentStore::from([("big.txt".to_string(), doc(&"a".repeat(6000)))]);

        let prompt = build_prompt("q", &mut session, &new);
        let expected = format!("{}...", "a".repeat(DOC_TEXT_LIMIT));
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"a".repeat(5001)));
    }

    #[test]
    fn test_raw_response_salvage() {
        let mut failed = ExtractedDocument::error("shape not recognized");
        failed.raw_response = Some(json!({"text": "salvaged body"}));
        let mut session = DocumentStore::new();
        let new = DocumentStore::from([("odd.pdf".to_string(), failed)]);

        let prompt = build_prompt("q", &mut session, &new);
        assert!(prompt.contains("salvaged body"));
    }

    #[test]
    fn test_error_placeholder() {
        let mut session = DocumentStore::new();
        let new = DocumentStore::from([(
            "bad.pdf".to_string(),
            ExtractedDocument::error("API failure"),
        )]);

        let prompt = build_prompt("q", &mut session, &new);
        assert!(prompt.contains("(Error extracting text: API failure)"));
    }

    #[test]
    fn test_no_documents_leaves_prompt_untouched() {
        let mut session = DocumentStore::new();
        let new = DocumentStore::new();
        let prompt = build_prompt("plain question", &mut session, &new);
        assert_eq!(prompt, "plain question");
    }
}
