// OCR provider client and document processing pipeline
//
// Turns uploaded bytes into extracted text: per-kind preprocessing
// (YAML/text decode, PDF signature gate, image optimization), a data-URL
// payload to the OCR endpoint, retry on rate limits and timeouts, and
// normalization of whatever shape the service answers with.

pub mod client;
pub mod error;
pub mod image;
pub mod pipeline;

pub use client::{
    HttpOcrTransport, OcrClient, OcrHttpResponse, OcrPayload, OcrRequest, OcrTransport, OCR_MODEL,
    OCR_TIMEOUT,
};
pub use error::{OcrError, Result};
pub use image::{prepare_image_for_ocr, MAX_DIMENSION};
pub use pipeline::DocumentPipeline;
