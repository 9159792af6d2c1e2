// Secondary export strategy
//
// Structured flowable rendering: the conversation is first lowered to a
// list of flowables (role headings, paragraphs, spacers), then the list is
// flowed onto pages. Message text is escaped for the internal paragraph
// markup, newlines become explicit break tags, and any single message is
// chunked into paragraphs of at most 2000 characters to keep individual
// flowables small.

use docchat_core::message::{ChatMessage, Role};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::error::Result;
use crate::{ExportOptions, ExportStrategy};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: f32 = 56.0;
const LEADING: f32 = 14.0;
const PARAGRAPH_GAP: f32 = 8.0;
const WRAP_WIDTH: usize = 85;
/// Upper bound on one flowable's text
const MAX_PARAGRAPH_CHARS: usize = 2000;
const BREAK_TAG: &str = "<br/>";

/// Visual treatment of one conversation role
struct RoleStyle {
    heading: &'static str,
    heading_font: &'static str,
    body_font: &'static str,
    size: f32,
    indent: f32,
    color: (f32, f32, f32),
}

fn style_for(role: Role) -> RoleStyle {
    match role {
        Role::User => RoleStyle {
            heading: "You",
            heading_font: "F2",
            body_font: "F1",
            size: 11.0,
            indent: 0.0,
            color: (0.15, 0.15, 0.5),
        },
        Role::Assistant => RoleStyle {
            heading: "Assistant",
            heading_font: "F2",
            body_font: "F3",
            size: 11.0,
            indent: 14.0,
            color: (0.1, 0.4, 0.2),
        },
    }
}

/// Intermediate layout element
enum Flowable {
    Heading(Role),
    Paragraph { role: Role, markup: String },
    Spacer,
}

/// Escape characters reserved by the paragraph markup
fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Reverse of [`escape_markup`]; ampersand last so entities survive intact
fn unescape_markup(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Split text into chunks of at most `limit` characters
fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    text.chars()
        .collect::<Vec<_>>()
        .chunks(limit)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Lower the conversation to a flowable list
fn build_flowables(messages: &[ChatMessage]) -> Vec<Flowable> {
    let mut flowables = Vec::new();
    for message in messages {
        flowables.push(Flowable::Heading(message.role));
        let escaped = escape_markup(&message.content);
        for chunk in chunk_text(&escaped, MAX_PARAGRAPH_CHARS) {
            flowables.push(Flowable::Paragraph {
                role: message.role,
                markup: chunk.replace('\n', BREAK_TAG),
            });
        }
        flowables.push(Flowable::Spacer);
    }
    flowables
}

fn wrap_chars(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if count > 0 && count + 1 + word_len > width {
            lines.push(std::mem::take(&mut current));
            count = 0;
        }
        if count > 0 {
            current.push(' ');
            count += 1;
        }
        current.push_str(word);
        count += word_len;
    }
    lines.push(current);
    lines
}

fn pdf_string(text: &str) -> Object {
    let bytes: Vec<u8> = text
        .chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

/// Accumulates absolutely positioned lines and breaks pages on overflow
struct PageBuilder {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl PageBuilder {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT as f32 - MARGIN,
        }
    }

    fn line(&mut self, text: &str, font: &str, size: f32, x: f32, color: (f32, f32, f32)) {
        if self.y < MARGIN + LEADING {
            self.break_page();
        }
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), size.into()]),
            Operation::new(
                "rg",
                vec![color.0.into(), color.1.into(), color.2.into()],
            ),
            Operation::new("Td", vec![x.into(), self.y.into()]),
            Operation::new("Tj", vec![pdf_string(text)]),
            Operation::new("ET", vec![]),
        ]);
        self.y -= LEADING;
    }

    fn space(&mut self, amount: f32) {
        self.y -= amount;
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT as f32 - MARGIN;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.current);
        self.pages
    }
}

/// Flowable-document renderer with per-role styles
pub struct SecondaryPdfStrategy;

impl ExportStrategy for SecondaryPdfStrategy {
    fn name(&self) -> &'static str {
        "secondary"
    }

    fn render(&self, messages: &[ChatMessage], options: &ExportOptions) -> Result<Vec<u8>> {
        let mut builder = PageBuilder::new();
        builder.line(&options.title, "F2", 14.0, MARGIN, (0.0, 0.0, 0.0));
        builder.line(
            &options.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            "F1",
            9.0,
            MARGIN,
            (0.4, 0.4, 0.4),
        );
        builder.space(PARAGRAPH_GAP);

        for flowable in build_flowables(messages) {
            match flowable {
                Flowable::Heading(role) => {
                    let style = style_for(role);
                    builder.line(
                        style.heading,
                        style.heading_font,
                        style.size,
                        MARGIN + style.indent,
                        style.color,
                    );
                }
                Flowable::Paragraph { role, markup } => {
                    let style = style_for(role);
                    for segment in markup.split(BREAK_TAG) {
                        let text = unescape_markup(segment);
                        if text.trim().is_empty() {
                            builder.space(LEADING / 2.0);
                            continue;
                        }
                        for line in wrap_chars(&text, WRAP_WIDTH) {
                            builder.line(
                                &line,
                                style.body_font,
                                style.size,
                                MARGIN + style.indent,
                                (0.0, 0.0, 0.0),
                            );
                        }
                    }
                }
                Flowable::Spacer => builder.space(PARAGRAPH_GAP),
            }
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular = doc.add_object(dictionary! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica-Bold",
        });
        let oblique = doc.add_object(dictionary! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica-Oblique",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => regular, "F2" => bold, "F3" => oblique },
        });

        let pages = builder.finish();
        let page_total = pages.len();
        let mut kids: Vec<Object> = Vec::with_capacity(page_total);
        for operations in pages {
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
            ChatMessage::user("Summarize the attached file."),
            ChatMessage::assistant("It is a quarterly report.", "msg_1"),
        ];
        let bytes = SecondaryPdfStrategy
            .render(&messages, &fixed_options())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_escape_round_trip() {
        let text = "a < b && c > d";
        assert_eq!(unescape_markup(&escape_markup(text)), text);
    }

    #[test]
    fn test_long_message_chunked_under_limit() {
        let text = "x".repeat(MAX_PARAGRAPH_CHARS * 2 + 500);
        let chunks = chunk_text(&text, MAX_PARAGRAPH_CHARS);
        assert_eq!(chunks.len(), 3);
        assert!(chunks
            .iter()
            .all(|c| c.chars().count() <= MAX_PARAGRAPH_CHARS));
    }

    #[test]
    fn test_newlines_become_break_tags() {
        let messages = vec![ChatMessage::user("line one\nline two")];
        let flowables = build_flowables(&messages);
        let markup = flowables
            .iter()
            .find_map(|f| match f {
                Flowable::Paragraph { markup, .. } => Some(markup.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(markup, "line one<br/>line two");
    }

    #[test]
    fn test_long_conversation_spans_pages() {
        let mut builder = PageBuilder::new();
        for i in 0..200 {
            builder.line(&format!("line {i}"), "F1", 11.0, MARGIN, (0.0, 0.0, 0.0));
        }
        assert!(builder.finish().len() > 1);
    }
}
