// Image optimization for OCR
//
// Scanned text reads best as grayscale, capped in size, and losslessly
// encoded when the page is bilevel-like. Optimization is strictly
// best-effort: any failure returns the original bytes with a default MIME
// type so submission is never blocked.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// Larger image dimension after optimization
pub const MAX_DIMENSION: u32 = 4000;

/// JPEG quality for non-bilevel images
const JPEG_QUALITY: u8 = 95;

/// Share of pixels in the two extreme intensity bins that marks a
/// bilevel-like page (scanned text)
const BILEVEL_THRESHOLD: f64 = 0.8;

/// Prepare image bytes for OCR submission
///
/// Returns the optimized bytes and their MIME type; on any failure the
/// original bytes come back untouched with a default type.
pub fn prepare_image_for_ocr(data: &[u8]) -> (Vec<u8>, &'static str) {
    match optimize(data) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("image optimization failed, submitting original bytes: {e}");
            (data.to_vec(), "image/jpeg")
        }
    }
}

fn optimize(data: &[u8]) -> Result<(Vec<u8>, &'static str), image::ImageError> {
    let img = image::load_from_memory(data)?;

    // Single channel unless it already is
    let mut img = match img {
        DynamicImage::ImageLuma8(_) => img,
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    };

    // Cap the larger dimension, preserving aspect ratio
    if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img = img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
    }

    let luma = img.to_luma8();
    let mut histogram = [0u64; 256];
    for pixel in luma.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    let extremes = histogram[0] + histogram[255];
    let bilevel = total > 0 && (extremes as f64) > (total as f64) * BILEVEL_THRESHOLD;

    let mut buffer = Cursor::new(Vec::new());
    if bilevel {
        // Lossless for document-like pages
        img.write_to(&mut buffer, ImageFormat::Png)?;
        Ok((buffer.into_inner(), "image/png"))
    } else {
        let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
        img.write_with_encoder(encoder)?;
        Ok((buffer.into_inner(), "image/jpeg"))
    }
}
