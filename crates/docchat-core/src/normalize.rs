// OCR response normalization
//
// The OCR service answers with one of several loosely-specified JSON shapes.
// `normalize` tries them in a fixed priority order and always hands back an
// ExtractedDocument; when no shape matches, a bounded recursive sweep over
// the whole structure salvages whatever string fields exist.

use serde_json::Value;

use crate::document::{ExtractedDocument, ExtractedFormat};

/// Recursion cutoff for the fallback field sweep
pub const MAX_EXTRACTION_DEPTH: usize = 5;

/// Max sequence elements visited per node during the fallback sweep
pub const MAX_SEQUENCE_ITEMS: usize = 20;

/// Cap on the serialized raw-response snapshot kept for diagnostics
const RAW_SNAPSHOT_LIMIT: usize = 10_000;

/// Interpret an OCR response of arbitrary shape
///
/// Priority order: `pages[].markdown`, top-level `text`, `elements[].text`,
/// top-level `content`, then the recursive sweep. Never panics or returns a
/// Result; failures come back as an error-carrying document.
pub fn normalize(response: &Value) -> ExtractedDocument {
    // Shape 1: pages with markdown, concatenated with a blank line
    if let Some(pages) = response.get("pages").and_then(Value::as_array) {
        if pages.first().map(|p| p.get("markdown").is_some()).unwrap_or(false) {
            let markdown = pages
                .iter()
                .map(|p| p.get("markdown").and_then(Value::as_str).unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\n\n");
            if !markdown.trim().is_empty() {
                return ExtractedDocument::new(markdown, ExtractedFormat::Markdown);
            }
        }
    }

    // Shape 2: top-level text, verbatim
    if let Some(text) = response.get("text").and_then(Value::as_str) {
        return ExtractedDocument::new(text, ExtractedFormat::Text);
    }

    // Shape 3: structured elements
    if let Some(elements) = response.get("elements").and_then(Value::as_array) {
        let parts: Vec<&str> = elements
            .iter()
            .filter_map(|e| e.get("text").and_then(Value::as_str))
            .collect();
        return ExtractedDocument::new(parts.join("\n"), ExtractedFormat::Elements);
    }

    // Shape 4: top-level content, verbatim
    if let Some(content) = response.get("content").and_then(Value::as_str) {
        return ExtractedDocument::new(content, ExtractedFormat::Content);
    }

    // Shape 5: recursive sweep, then a diagnostic "unknown" result
    let lines = extract_all_text_fields(response, "", MAX_EXTRACTION_DEPTH, 0);
    if !lines.is_empty() {
        return ExtractedDocument::new(lines.join("\n"), ExtractedFormat::Extracted);
    }

    let snapshot = match serde_json::to_string_pretty(response) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("failed to serialize OCR response for diagnostics: {e}");
            return ExtractedDocument::error(format!("Error processing OCR response: {e}"));
        }
    };
    let snapshot = if snapshot.len() > RAW_SNAPSHOT_LIMIT {
        let mut cut = RAW_SNAPSHOT_LIMIT;
        while !snapshot.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated]", &snapshot[..cut])
    } else {
        snapshot
    };

    ExtractedDocument {
        text: "No structured text found in the OCR response. See the raw snapshot for details."
            .to_string(),
        format: ExtractedFormat::Unknown,
        error: None,
        raw_response: Some(Value::String(snapshot)),
    }
}

/// Sweep a nested structure for string fields, emitting `path: value` lines
///
/// Recursion stops past `max_depth`; sequences are visited up to
/// [`MAX_SEQUENCE_ITEMS`] elements with a summary line when truncated.
pub fn extract_all_text_fields(
    data: &Value,
    prefix: &str,
    max_depth: usize,
    current_depth: usize,
) -> Vec<String> {
    if current_depth > max_depth {
        return Vec::new();
    }

    let mut result = Vec::new();

    match data {
        Value::Object(map) => {
            for (key, value) in map {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };

                match value {
                    Value::String(s) if s.chars().count() > 1 => {
                        result.push(format!("{new_prefix}: {s}"));
                    }
                    Value::Object(inner) if !inner.is_empty() => {
                        result.extend(extract_all_text_fields(
                            value,
                            &new_prefix,
                            max_depth,
                            current_depth + 1,
                        ));
                    }
                    Value::Array(inner) if !inner.is_empty() => {
                        result.extend(extract_all_text_fields(
                            value,
                            &new_prefix,
                            max_depth,
                            current_depth + 1,
                        ));
                    }
                    _ => {}
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().take(MAX_SEQUENCE_ITEMS).enumerate() {
                let new_prefix = format!("{prefix}[{i}]");
                match item {
                    Value::Object(inner) if !inner.is_empty() => {
                        result.extend(extract_all_text_fields(
                            item,
                            &new_prefix,
                            max_depth,
                            current_depth + 1,
                        ));
                    }
                    Value::Array(inner) if !inner.is_empty() => {
                        result.extend(extract_all_text_fields(
                            item,
                            &new_prefix,
                            max_depth,
                            current_depth + 1,
                        ));
                    }
                    Value::String(s) if s.chars().count() > 1 => {
                        result.push(format!("{new_prefix}: {s}"));
                    }
                    _ => {}
                }
            }
            if items.len() > MAX_SEQUENCE_ITEMS {
                result.push(format!(
                    "{prefix}: [... {} additional elements omitted]",
                    items.len() - MAX_SEQUENCE_ITEMS
                ));
            }
        }
        _ => {}
    }

    result
}
