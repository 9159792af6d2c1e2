// Primary export strategy
//
// Paginated rendering with a page header and footer. Message text goes
// through markdown-lite preprocessing (headings flattened, images replaced
// with a placeholder, links reduced to their label), word wrapping at a
// conservative width with bullet-aware indentation, and a safe cell writer
// that strips non-representable characters and chunks overlong lines. A
// line that survives none of that is rendered alphanumeric-only, truncated.

use docchat_core::message::{ChatMessage, Role};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use regex::Regex;

use crate::error::Result;
use crate::{ExportOptions, ExportStrategy};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: f32 = 50.0;
const BODY_SIZE: f32 = 11.0;
const LEADING: f32 = 14.0;
const HEADER_SIZE: f32 = 9.0;
const WRAP_WIDTH: usize = 90;
const LINES_PER_PAGE: usize = 48;
/// Cap on the alphanumeric-only last-resort rendering of a hostile line
const LAST_RESORT_LIMIT: usize = 200;

struct PreprocessPatterns {
    heading: Regex,
    image: Regex,
    link: Regex,
}

impl PreprocessPatterns {
    fn compile() -> Result<Self> {
        Ok(Self {
            heading: Regex::new(r"(?m)^#{1,6}\s+")?,
            // The image pattern must run before the link pattern; an image
            // tag is a link tag with a leading bang
            image: Regex::new(r"!\[[^\]]*\]\([^)]*\)")?,
            link: Regex::new(r"\[([^\]]+)\]\([^)]*\)")?,
        })
    }
}

/// Flatten markdown constructs the page renderer cannot draw
fn preprocess(text: &str, patterns: &PreprocessPatterns) -> String {
    let text = patterns.image.replace_all(text, "[image]");
    let text = patterns.link.replace_all(&text, "$1");
    let text = patterns.heading.replace_all(&text, "");
    text.replace("**", "").replace("__", "")
}

/// Bulleted-line detection: returns the body after the bullet marker
fn bullet_body(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
}

/// Greedy word wrap; continuation lines get the given prefix
fn wrap_words(body: &str, first: &str, cont: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = first.to_string();
    let mut has_word = false;
    for word in body.split_whitespace() {
        if has_word && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(current);
            current = cont.to_string();
            has_word = false;
        }
        if has_word {
            current.push(' ');
        }
        current.push_str(word);
        has_word = true;
    }
    lines.push(current);
    lines
}

/// Sanitize one wrapped line for the page
///
/// Characters outside the Latin-1 printable range are dropped. A line that
/// is mostly non-representable is treated as hostile and rendered
/// alphanumeric-only, truncated. Lines still over width (unbreakable
/// tokens) are chunked.
fn safe_cell(line: &str) -> Vec<String> {
    let total = line.chars().count();
    let cleaned: String = line
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ' || ('\u{00A0}'..='\u{00FF}').contains(c))
        .collect();
    let dropped = total - cleaned.chars().count();
    let cleaned = if dropped * 2 > total {
        line.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
            .take(LAST_RESORT_LIMIT)
            .collect()
    } else {
        cleaned
    };

    if cleaned.chars().count() <= WRAP_WIDTH {
        vec![cleaned]
    } else {
        cleaned
            .chars()
            .collect::<Vec<_>>()
            .chunks(WRAP_WIDTH)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }
}

/// Encode text as a Latin-1 PDF string literal
fn pdf_string(text: &str) -> Object {
    let bytes: Vec<u8> = text
        .chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

/// Lay one message out as wrapped, sanitized page lines
fn layout_message(message: &ChatMessage, patterns: &PreprocessPatterns) -> Vec<String> {
    let label = match message.role {
        Role::User => "You:",
        Role::Assistant => "Assistant:",
    };
    let mut lines = vec![label.to_string()];

    let processed = preprocess(&message.content, patterns);
    for raw in processed.lines() {
        if raw.trim().is_empty() {
            lines.push(String::new());
        } else if let Some(body) = bullet_body(raw) {
            lines.extend(wrap_words(body, "  - ", "    ", WRAP_WIDTH));
        } else {
            lines.extend(wrap_words(raw, "", "", WRAP_WIDTH));
        }
    }
    lines.push(String::new());

    lines.iter().flat_map(|line| safe_cell(line)).collect()
}

fn page_operations(
    chunk: &[String],
    page_number: usize,
    page_total: usize,
    options: &ExportOptions,
) -> Vec<Operation> {
    let mut ops = vec![
        // Header
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), HEADER_SIZE.into()]),
        Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT as f32 - 30.0).into()]),
        Operation::new("Tj", vec![pdf_string(&options.title)]),
        Operation::new("ET", vec![]),
        // Body
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), BODY_SIZE.into()]),
        Operation::new("TL", vec![LEADING.into()]),
        Operation::new(
            "Td",
            vec![MARGIN.into(), (PAGE_HEIGHT as f32 - MARGIN - LEADING).into()],
        ),
    ];
    for line in chunk {
        ops.push(Operation::new("Tj", vec![pdf_string(line)]));
        ops.push(Operation::new("T*", vec![]));
    }
    ops.push(Operation::new("ET", vec![]));

    let footer = format!(
        "Generated {} - page {page_number}/{page_total}",
        options.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    ops.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), HEADER_SIZE.into()]),
        Operation::new("Td", vec![MARGIN.into(), 30.0_f32.into()]),
        Operation::new("Tj", vec![pdf_string(&footer)]),
        Operation::new("ET", vec![]),
    ]);
    ops
}

/// Paginated header/footer renderer
pub struct PrimaryPdfStrategy;

impl ExportStrategy for PrimaryPdfStrategy {
    fn name(&self) -> &'static str {
        "primary"
    }

    fn render(&self, messages: &[ChatMessage], options: &ExportOptions) -> Result<Vec<u8>> {
        let patterns = PreprocessPatterns::compile()?;
        let mut lines: Vec<String> = Vec::new();
        for message in messages {
            lines.extend(layout_message(message, &patterns));
        }
        if lines.is_empty() {
            lines.push("(empty conversation)".to_string());
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let body_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let header_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => body_font, "F2" => header_font },
        });

        let chunks: Vec<&[String]> = lines.chunks(LINES_PER_PAGE).collect();
        let page_total = chunks.len();
        let mut kids: Vec<Object> = Vec::with_capacity(page_total);
        for (index, chunk) in chunks.iter().enumerate() {
            let content = Content {
                operations: page_operations(chunk, index + 1, page_total, options),
            };
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
        let info_id = doc.add_object(dictionary! {
            "Title" => pdf_string(&options.title),
            "CreationDate" => pdf_string(&format!(
                "D:{}Z",
                options.generated_at.format("%Y%m%d%H%M%S")
            )),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fixed_options() -> ExportOptions {
        ExportOptions::new("Chat Conversation Export")
            .with_generated_at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let messages = vec![
            ChatMessage::user("What changed in the handbook?"),
            ChatMessage::assistant("Section 3 was rewritten.", "msg_1"),
        ];
        let bytes = PrimaryPdfStrategy
            .render(&messages, &fixed_options())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_identical_inputs_produce_identical_bytes() {
        let messages = vec![ChatMessage::user("hello")];
        let a = PrimaryPdfStrategy
            .render(&messages, &fixed_options())
            .unwrap();
        let b = PrimaryPdfStrategy
            .render(&messages, &fixed_options())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_preprocess_flattens_markdown() {
        let patterns = PreprocessPatterns::compile().unwrap();
        let text = "# Title\nSee [the docs](https://example.com) and ![chart](img.png).\n**bold**";
        let processed = preprocess(text, &patterns);
        assert!(processed.contains("Title"));
        assert!(!processed.contains('#'));
        assert!(processed.contains("See the docs and [image]."));
        assert!(processed.contains("bold"));
        assert!(!processed.contains("**"));
    }

    #[test]
    fn test_wrap_respects_width() {
        let body = "word ".repeat(50);
        for line in wrap_words(&body, "", "", WRAP_WIDTH) {
            assert!(line.chars().count() <= WRAP_WIDTH);
        }
    }

    #[test]
    fn test_bullet_lines_get_indented_continuations() {
        let message = ChatMessage::user(format!("- {}", "item ".repeat(40)));
        let patterns = PreprocessPatterns::compile().unwrap();
        let lines = layout_message(&message, &patterns);
        assert!(lines[1].starts_with("  - "));
        assert!(lines[2].starts_with("    "));
    }

    #[test]
    fn test_safe_cell_keeps_representable_part() {
        let lines = safe_cell("abc \u{1F600} def");
        assert_eq!(lines, vec!["abc  def".to_string()]);
    }

    #[test]
    fn test_safe_cell_hostile_line_rendered_alphanumeric_only() {
        // Mostly non-representable; only alphanumerics survive
        let lines = safe_cell("\u{1F600}\u{1F601}\u{1F602}a1\u{2192}");
        assert_eq!(lines, vec!["a1".to_string()]);
    }

    #[test]
    fn test_safe_cell_chunks_unbreakable_tokens() {
        let token = "x".repeat(WRAP_WIDTH * 2 + 10);
        let lines = safe_cell(&token);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.chars().count() <= WRAP_WIDTH));
    }
}
