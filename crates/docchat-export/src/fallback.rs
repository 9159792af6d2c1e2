// Fallback export strategy
//
// Minimal single-font rendering that trades fidelity for survival. No
// markdown handling, forced ASCII-only substitution, fixed 50-character
// chunking, and per-chunk error swallowing so one bad chunk never aborts
// the whole document.

use docchat_core::message::{ChatMessage, Role};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::error::{ExportError, Result};
use crate::{ExportOptions, ExportStrategy};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: f32 = 50.0;
const LEADING: f32 = 12.0;
const FONT_SIZE: f32 = 10.0;
/// Fixed chunk length; no wrapping logic beyond this
const CHUNK_LEN: usize = 50;

/// Replace anything outside printable ASCII with a question mark
fn ascii_substitute(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c == '\n' || (' '..='~').contains(&c) {
                c
            } else {
                '?'
            }
        })
        .collect()
}

/// Fixed-length chunks, one rendered line each
fn fixed_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            chunks.push(String::new());
            continue;
        }
        let chars: Vec<char> = line.chars().collect();
        for chunk in chars.chunks(CHUNK_LEN) {
            chunks.push(chunk.iter().collect());
        }
    }
    chunks
}

/// Build the draw operation for one chunk
///
/// Substitution upstream should guarantee ASCII; a chunk that still is not
/// fails here and is skipped by the caller rather than aborting the export.
fn chunk_operation(chunk: &str) -> Result<Operation> {
    if !chunk.is_ascii() {
        return Err(ExportError::render("non-ASCII chunk after substitution"));
    }
    Ok(Operation::new(
        "Tj",
        vec![Object::String(
            chunk.as_bytes().to_vec(),
            StringFormat::Literal,
        )],
    ))
}

/// Minimal last-ditch renderer
pub struct FallbackPdfStrategy;

impl ExportStrategy for FallbackPdfStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn render(&self, messages: &[ChatMessage], options: &ExportOptions) -> Result<Vec<u8>> {
        let mut chunks = vec![
            ascii_substitute(&options.title),
            format!("Generated {}", options.generated_at.format("%Y-%m-%d %H:%M UTC")),
            String::new(),
        ];
        for message in messages {
            let label = match message.role {
                Role::User => "You:",
                Role::Assistant => "Assistant:",
            };
            chunks.push(label.to_string());
            chunks.extend(fixed_chunks(&ascii_substitute(&message.content)));
            chunks.push(String::new());
        }

        let lines_per_page =
            ((PAGE_HEIGHT as f32 - 2.0 * MARGIN) / LEADING).floor() as usize;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        // The title block above guarantees at least one page
        let page_chunks: Vec<&[String]> = chunks.chunks(lines_per_page).collect();
        let page_total = page_chunks.len();
        let mut kids: Vec<Object> = Vec::with_capacity(page_total);
        for page in &page_chunks {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
                Operation::new("TL", vec![LEADING.into()]),
                Operation::new(
                    "Td",
                    vec![MARGIN.into(), (PAGE_HEIGHT as f32 - MARGIN).into()],
                ),
            ];
            for chunk in *page {
                match chunk_operation(chunk) {
                    Ok(op) => operations.push(op),
                    Err(e) => {
                        tracing::warn!("skipping unrenderable chunk: {e}");
                    }
                }
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_total as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}
