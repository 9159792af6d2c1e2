// File classification and validation
//
// Two entry points over an uploaded stream:
// - `validate` gates a file against the extension allow-list and checks that
//   the content matches the declared kind;
// - `detect_kind` sniffs the kind best-effort when the caller wants graceful
//   degradation instead of rejection.
//
// Both restore the stream's read position on every exit path, pass or fail:
// the same handle is inspected by multiple stages in sequence.

use std::io::{Read, Seek, SeekFrom};

use crate::document::{Classification, DocumentKind};

/// Extensions accepted by `validate`, in display order
pub const ALLOWED_EXTENSIONS: &[&str] = &[".yml", ".yaml", ".pdf", ".txt", ".jpg", ".jpeg", ".png"];

/// Wider suffix set recognized by `detect_kind` as images
const IMAGE_SUFFIXES: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp",
];

fn extension_of(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) => file_name[idx..].to_lowercase(),
        None => String::new(),
    }
}

fn kind_for_extension(ext: &str) -> Option<DocumentKind> {
    match ext {
        ".yml" | ".yaml" => Some(DocumentKind::Yaml),
        ".pdf" => Some(DocumentKind::Pdf),
        ".jpg" | ".jpeg" | ".png" => Some(DocumentKind::Image),
        ".txt" => Some(DocumentKind::Text),
        _ => None,
    }
}

/// Validate an uploaded file against its declared extension
///
/// Returns a rejection (never an error) for disallowed extensions, content
/// that does not match the extension, and I/O failures while checking.
pub fn validate<R: Read + Seek>(file_name: &str, reader: &mut R) -> Classification {
    if file_name.is_empty() {
        return Classification::invalid("File has no name");
    }

    let ext = extension_of(&file_name.to_lowercase());
    let Some(kind) = kind_for_extension(&ext) else {
        return Classification::invalid(format!(
            "File format not allowed. Use: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ));
    };

    let position = match reader.stream_position() {
        Ok(p) => p,
        Err(e) => return Classification::invalid(format!("Error validating file: {e}")),
    };

    let outcome = check_content(kind, reader);

    // Restore the cursor whatever the check concluded
    if let Err(e) = reader.seek(SeekFrom::Start(position)) {
        tracing::warn!("failed to restore stream position after validation: {e}");
    }

    match outcome {
        Ok(()) => Classification::valid(kind),
        Err(msg) => Classification::invalid(msg),
    }
}

fn check_content<R: Read + Seek>(kind: DocumentKind, reader: &mut R) -> Result<(), String> {
    match kind {
        DocumentKind::Pdf => {
            let mut header = [0u8; 8];
            let n = reader
                .read(&mut header)
                .map_err(|e| format!("Error validating file: {e}"))?;
            if !header[..n].starts_with(b"%PDF") {
                return Err("File is not a valid PDF".to_string());
            }
        }
        DocumentKind::Image => {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(|e| format!("Error validating file: {e}"))?;
            // Full decode doubles as structural verification
            image::load_from_memory(&buf)
                .map_err(|e| format!("File is not a valid image: {e}"))?;
        }
        DocumentKind::Yaml => {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(|e| format!("Error validating file: {e}"))?;
            serde_yaml::from_slice::<serde_yaml::Value>(&buf)
                .map_err(|e| format!("File is not valid YAML: {e}"))?;
        }
        DocumentKind::Text => {}
    }
    Ok(())
}

/// Best-effort kind sniffing (no validation)
///
/// Priority: declared MIME type, filename suffix, byte signature, attempted
/// image decode, then `Text` as the default. Used where classification must
/// degrade gracefully rather than reject.
pub fn detect_kind<R: Read + Seek>(
    file_name: Option<&str>,
    mime_type: Option<&str>,
    reader: &mut R,
) -> DocumentKind {
    if let Some(mime) = mime_type {
        if mime.starts_with("application/pdf") {
            return DocumentKind::Pdf;
        } else if mime.starts_with("image/") {
            return DocumentKind::Image;
        } else if mime == "text/yaml" || mime == "application/x-yaml" {
            return DocumentKind::Yaml;
        }
    }

    if let Some(name) = file_name {
        let name = name.to_lowercase();
        if name.ends_with(".pdf") {
            return DocumentKind::Pdf;
        } else if IMAGE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            return DocumentKind::Image;
        } else if name.ends_with(".yml") || name.ends_with(".yaml") {
            return DocumentKind::Yaml;
        } else if name.ends_with(".txt") {
            return DocumentKind::Text;
        }
    }

    if let Some(kind) = sniff_signature(reader) {
        return kind;
    }

    if decodes_as_image(reader) {
        return DocumentKind::Image;
    }

    DocumentKind::Text
}

fn sniff_signature<R: Read + Seek>(reader: &mut R) -> Option<DocumentKind> {
    let position = reader.stream_position().ok()?;
    let mut header = [0u8; 8];
    let n = reader.read(&mut header).ok()?;
    let _ = reader.seek(SeekFrom::Start(position));
    let header = &header[..n];

    if header.starts_with(b"%PDF") {
        Some(DocumentKind::Pdf)
    } else if header.starts_with(b"\x89PNG") || header.starts_with(b"\xff\xd8") {
        Some(DocumentKind::Image)
    } else {
        None
    }
}

fn decodes_as_image<R: Read + Seek>(reader: &mut R) -> bool {
    let Ok(position) = reader.stream_position() else {
        return false;
    };
    let mut buf = Vec::new();
    let readable = reader.read_to_end(&mut buf).is_ok();
    let _ = reader.seek(SeekFrom::Start(position));
    readable && image::load_from_memory(&buf).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255u8, 255, 255]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_valid_pdf() {
        let mut reader = Cursor::new(b"%PDF-1.4 fake body".to_vec());
        let result = validate("report.pdf", &mut reader);
        assert!(result.is_valid);
        assert_eq!(result.kind, Some(DocumentKind::Pdf));
    }

    #[test]
    fn test_pdf_with_wrong_signature() {
        let mut reader = Cursor::new(b"not a pdf at all".to_vec());
        let result = validate("report.pdf", &mut reader);
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("PDF"));
    }

    #[test]
    fn test_valid_image() {
        let mut reader = Cursor::new(tiny_png());
        let result = validate("scan.png", &mut reader);
        assert!(result.is_valid);
        assert_eq!(result.kind, Some(DocumentKind::Image));
    }

    #[test]
    fn test_corrupt_image() {
        let mut reader = Cursor::new(b"\x89PNG but garbage after".to_vec());
        let result = validate("scan.png", &mut reader);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_valid_yaml() {
        let mut reader = Cursor::new(b"key: value\nitems:\n  - a\n  - b\n".to_vec());
        let result = validate("config.yaml", &mut reader);
        assert!(result.is_valid);
        assert_eq!(result.kind, Some(DocumentKind::Yaml));
    }

    #[test]
    fn test_malformed_yaml() {
        let mut reader = Cursor::new(b"key: [unclosed\n  bad".to_vec());
        let result = validate("config.yml", &mut reader);
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("YAML"));
    }

    #[test]
    fn test_text_passes_without_content_check() {
        let mut reader = Cursor::new(b"\xff\xfe arbitrary bytes".to_vec());
        let result = validate("notes.txt", &mut reader);
        assert!(result.is_valid);
        assert_eq!(result.kind, Some(DocumentKind::Text));
    }

    #[test]
    fn test_disallowed_extension_lists_allowed_set() {
        let mut reader = Cursor::new(b"whatever".to_vec());
        let result = validate("archive.zip", &mut reader);
        assert!(!result.is_valid);
        let msg = result.error.unwrap();
        for ext in ALLOWED_EXTENSIONS {
            assert!(msg.contains(ext), "missing {ext} in: {msg}");
        }
    }

    #[test]
    fn test_nameless_upload_rejected() {
        let mut reader = Cursor::new(b"data".to_vec());
        let result = validate("", &mut reader);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_position_restored_on_pass_and_fail() {
        // Pass case, cursor not at origin
        let mut reader = Cursor::new(b"xx%PDF-1.7 body".to_vec());
        reader.set_position(2);
        let result = validate("a.pdf", &mut reader);
        assert!(result.is_valid);
        assert_eq!(reader.position(), 2);

        // Fail case
        let mut reader = Cursor::new(b"xxgarbage".to_vec());
        reader.set_position(2);
        let result = validate("a.pdf", &mut reader);
        assert!(!result.is_valid);
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_detect_kind_priority() {
        let mut reader = Cursor::new(Vec::new());

        // MIME wins over everything
        assert_eq!(
            detect_kind(Some("x.txt"), Some("application/pdf"), &mut reader),
            DocumentKind::Pdf
        );

        // Suffix next, with the wider image set
        assert_eq!(
            detect_kind(Some("photo.webp"), None, &mut reader),
            DocumentKind::Image
        );

        // Byte signature when name and MIME say nothing
        let mut pdf_reader = Cursor::new(b"%PDF-1.5".to_vec());
        assert_eq!(detect_kind(None, None, &mut pdf_reader), DocumentKind::Pdf);
        assert_eq!(pdf_reader.position(), 0);

        let mut jpeg_reader = Cursor::new(b"\xff\xd8\xff\xe0".to_vec());
        assert_eq!(detect_kind(None, None, &mut jpeg_reader), DocumentKind::Image);

        // Default
        let mut text_reader = Cursor::new(b"hello world".to_vec());
        assert_eq!(detect_kind(None, None, &mut text_reader), DocumentKind::Text);
    }

    #[test]
    fn test_detect_kind_image_decode_last_resort() {
        // GIF signature is not in the sniff list; the decode attempt catches it
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([0u8, 0, 0, 255]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Gif)
            .unwrap();
        let mut reader = Cursor::new(buf.into_inner());
        assert_eq!(detect_kind(None, None, &mut reader), DocumentKind::Image);
        assert_eq!(reader.position(), 0);
    }
}
