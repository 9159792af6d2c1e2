// Document processing pipeline
//
// Per-kind preprocessing ahead of the OCR call:
// - YAML is decoded and validated locally; a parse failure silently
//   reclassifies the file as Text (best effort, the original intent wins)
// - Text is decoded with an encoding fallback chain; bytes that defeat every
//   decoder are submitted to OCR as a plain-text document payload
// - PDF must carry the %PDF signature; the page count is probed as a
//   log-only health signal
// - Images are optimized before submission
//
// Every path returns an ExtractedDocument; nothing here raises to the caller.

use docchat_core::document::{DocumentKind, ExtractedDocument, ExtractedFormat};
use docchat_core::status::{Phase, StatusSink};
use uuid::Uuid;

use crate::client::{HttpOcrTransport, OcrClient, OcrPayload, OcrTransport};
use crate::error::Result;
use crate::image::prepare_image_for_ocr;

/// Drives per-kind preprocessing and the OCR submission for one document
pub struct DocumentPipeline<T> {
    client: OcrClient<T>,
}

impl DocumentPipeline<HttpOcrTransport> {
    /// Pipeline against the real OCR endpoint
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: OcrClient::new(api_key, base_url)?,
        })
    }
}

impl<T: OcrTransport> DocumentPipeline<T> {
    /// Pipeline over an arbitrary OCR client (tests, custom transports)
    pub fn with_client(client: OcrClient<T>) -> Self {
        Self { client }
    }

    /// Process one document's bytes into extracted text
    pub async fn process(
        &self,
        bytes: &[u8],
        kind: DocumentKind,
        file_name: &str,
        status: &dyn StatusSink,
    ) -> ExtractedDocument {
        let job_id = Uuid::new_v4();
        tracing::info!(%job_id, file_name, %kind, "processing document");
        status.update(
            Phase::Preparing,
            &format!("Preparing document {file_name} for OCR..."),
        );

        let mut kind = kind;

        if kind == DocumentKind::Yaml {
            match std::str::from_utf8(bytes) {
                Ok(content) if serde_yaml::from_str::<serde_yaml::Value>(content).is_ok() => {
                    return ExtractedDocument::new(content, ExtractedFormat::Yaml);
                }
                _ => {
                    // Best effort: retry the file under the Text path
                    tracing::warn!(file_name, "YAML parse failed, treating as text");
                    status.update(
                        Phase::Preparing,
                        &format!("{file_name} is not valid YAML, treating as plain text"),
                    );
                    kind = DocumentKind::Text;
                }
            }
        }

        let payload = match kind {
            DocumentKind::Text => match decode_text_bytes(bytes) {
                Some(content) => {
                    return ExtractedDocument::new(content, ExtractedFormat::Text);
                }
                None => {
                    // Undecodable bytes still get a shot through OCR
                    status.update(
                        Phase::Preparing,
                        &format!("Converting text document {file_name} for OCR..."),
                    );
                    OcrPayload::document("text/plain", bytes)
                }
            },
            DocumentKind::Pdf => {
                if !bytes.starts_with(b"%PDF") {
                    let msg = "File is not a valid PDF: missing %PDF signature".to_string();
                    tracing::error!(file_name, "{msg}");
                    status.update(Phase::Error, &msg);
                    return ExtractedDocument::error(msg);
                }
                // Structural probe is log-only; an unreadable page tree does
                // not block submission once the signature matched
                match lopdf::Document::load_mem(bytes) {
                    Ok(doc) => {
                        tracing::info!(file_name, pages = doc.get_pages().len(), "PDF structure ok");
                    }
                    Err(e) => {
                        tracing::warn!(file_name, "could not read PDF structure: {e}");
                    }
                }
                OcrPayload::document("application/pdf", bytes)
            }
            DocumentKind::Image => {
                let (optimized, mime) = prepare_image_for_ocr(bytes);
                OcrPayload::image(mime, &optimized)
            }
            DocumentKind::Yaml => unreachable!("yaml reclassified above"),
        };

        self.client.process(payload, status).await
    }
}

/// Decode text bytes with an ordered encoding fallback chain
///
/// Strict UTF-8 first, then windows-1252 (rejected when the decoder reports
/// errors), then latin-1 as the catch-all. Returns None only if every
/// decoder refuses the input.
fn decode_text_bytes(bytes: &[u8]) -> Option<String> {
    if let Ok(content) = std::str::from_utf8(bytes) {
        return Some(content.to_string());
    }

    let (content, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if !had_errors {
        return Some(content.into_owned());
    }

    Some(encoding_rs::mem::decode_latin1(bytes).into_owned())
}
