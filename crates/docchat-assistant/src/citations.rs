// Citation resolution
//
// Assistant messages carry inline annotations pointing at supporting files.
// Each annotation's literal span is replaced with a bracketed ordinal, and a
// References section maps the ordinals back to human-readable names via the
// session's file metadata.

use std::collections::HashMap;

use docchat_core::document::FileMetadata;

use crate::api::{MessageContent, ThreadMessage};

/// Label used when a cited file id has no recorded metadata
const UNKNOWN_SOURCE: &str = "Reference document";

/// Render an assistant message with its citations resolved
pub fn process_message_with_citations(
    message: &ThreadMessage,
    file_metadata: &HashMap<String, FileMetadata>,
) -> String {
    if message.content.is_empty() {
        return "Could not process the message".to_string();
    }

    let mut processed = String::new();
    for item in &message.content {
        match item {
            MessageContent::Text { text } => {
                let mut value = text.value.clone();
                let mut citations = Vec::new();

                for (idx, annotation) in text.annotations.iter().enumerate() {
                    let marker = format!("[{}]", idx + 1);
                    if !annotation.text.is_empty() {
                        value = value.replace(&annotation.text, &marker);
                    }

                    if let Some(citation) = &annotation.file_citation {
                        let name = file_metadata
                            .get(&citation.file_id)
                            .map(|m| m.name.clone())
                            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
                        citations.push(format!("{marker} Source: {name}"));
                    }
                }

                if !citations.is_empty() {
                    value.push_str("\n\n--- References: ---\n");
                    value.push_str(&citations.join("\n"));
                }

                processed.push_str(&value);
            }
            MessageContent::Other => {
                processed.push_str("[unsupported content]");
            }
        }
    }

    processed
}
