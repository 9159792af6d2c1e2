// OCR API client
//
// Wire contract: POST {base}/v1/ocr with `{model, document}` where document
// is a data-URL payload, bearer auth, 90 second request timeout. HTTP 429
// and network timeouts are retried with linearly increasing backoff; a JSON
// body that fails to parse is retried within the same budget; any other
// non-200 response is terminal.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;

use docchat_core::document::ExtractedDocument;
use docchat_core::normalize::normalize;
use docchat_core::retry::RetryPolicy;
use docchat_core::status::{Phase, StatusSink};

use crate::error::{OcrError, Result};

/// Model id sent with every OCR request
pub const OCR_MODEL: &str = "mistral-ocr-latest";

/// Per-attempt request timeout
pub const OCR_TIMEOUT: Duration = Duration::from_secs(90);

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";

/// Document payload for the OCR request body
///
/// Serializes to `{"type": "document_url", "document_url": "data:..."}` or
/// the `image_url` twin.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OcrPayload {
    Document {
        #[serde(rename = "type")]
        kind: &'static str,
        document_url: String,
    },
    Image {
        #[serde(rename = "type")]
        kind: &'static str,
        image_url: String,
    },
}

impl OcrPayload {
    /// Build a `document_url` payload from raw bytes
    pub fn document(mime: &str, bytes: &[u8]) -> Self {
        OcrPayload::Document {
            kind: "document_url",
            document_url: data_url(mime, bytes),
        }
    }

    /// Build an `image_url` payload from raw bytes
    pub fn image(mime: &str, bytes: &[u8]) -> Self {
        OcrPayload::Image {
            kind: "image_url",
            image_url: data_url(mime, bytes),
        }
    }

    /// Payload type label, for logging
    pub fn kind_label(&self) -> &'static str {
        match self {
            OcrPayload::Document { kind, .. } | OcrPayload::Image { kind, .. } => kind,
        }
    }

    /// Encoded payload size in characters, for logging
    pub fn content_size(&self) -> usize {
        match self {
            OcrPayload::Document { document_url, .. } => document_url.len(),
            OcrPayload::Image { image_url, .. } => image_url.len(),
        }
    }
}

fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Full OCR request body
#[derive(Debug, Clone, Serialize)]
pub struct OcrRequest {
    pub model: &'static str,
    pub document: OcrPayload,
}

/// One HTTP exchange's outcome, before retry classification
#[derive(Debug, Clone)]
pub struct OcrHttpResponse {
    pub status: u16,
    pub body: String,
}

/// Transport seam for the OCR service; mocked in tests
#[async_trait]
pub trait OcrTransport: Send + Sync {
    async fn submit(&self, request: &OcrRequest) -> Result<OcrHttpResponse>;
}

/// reqwest-backed transport with bearer auth and the 90 s timeout
pub struct HttpOcrTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpOcrTransport {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(OCR_TIMEOUT)
            .build()
            .map_err(|e| OcrError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl OcrTransport for HttpOcrTransport {
    async fn submit(&self, request: &OcrRequest) -> Result<OcrHttpResponse> {
        let url = format!("{}/v1/ocr", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OcrError::Timeout
                } else {
                    OcrError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| OcrError::Network(e.to_string()))?;
        Ok(OcrHttpResponse { status, body })
    }
}

/// OCR client: submits a payload and normalizes the response, retrying
/// transient failures per its [`RetryPolicy`]
pub struct OcrClient<T> {
    transport: T,
    retry: RetryPolicy,
}

impl OcrClient<HttpOcrTransport> {
    /// Client against the real OCR endpoint
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        Ok(Self::with_transport(HttpOcrTransport::new(
            api_key, base_url,
        )?))
    }
}

impl<T: OcrTransport> OcrClient<T> {
    /// Client over an arbitrary transport, default retry policy
    /// (3 attempts, 2 s linear backoff)
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            retry: RetryPolicy::linear(Duration::from_secs(2), 3),
        }
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Submit a payload and return the normalized extraction result
    ///
    /// Every code path returns a document; transport and parse failures are
    /// converted to error-carrying results, never propagated.
    pub async fn process(&self, payload: OcrPayload, status: &dyn StatusSink) -> ExtractedDocument {
        let request = OcrRequest {
            model: OCR_MODEL,
            document: payload,
        };
        tracing::info!(
            document_type = request.document.kind_label(),
            content_size = request.document.content_size(),
            "submitting OCR request"
        );

        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let delay = self.retry.delay_for_attempt(attempt);
            if !delay.is_zero() {
                status.update(
                    Phase::Waiting,
                    &format!("Retrying in {:.0}s...", delay.as_secs_f64()),
                );
                tokio::time::sleep(delay).await;
            }
            status.update(Phase::Submitting, "Sending document to the OCR API...");

            match self.transport.submit(&request).await {
                Ok(response) if response.status == 200 => {
                    match serde_json::from_str::<serde_json::Value>(&response.body) {
                        Ok(value) => {
                            if value.as_object().map(|o| o.is_empty()).unwrap_or(false) {
                                status.update(Phase::Error, "The API returned no content");
                                return ExtractedDocument::error("The API returned no content")
                                    .with_raw_response(value);
                            }
                            status.update(Phase::Complete, "Document processed successfully");
                            return normalize(&value);
                        }
                        Err(e) => {
                            // Treat a malformed 200 body as transient; the
                            // service occasionally truncates under load
                            let msg = format!("Error parsing JSON response: {e}");
                            tracing::error!("{msg}");
                            if !self.retry.has_attempts_remaining(attempt) {
                                status.update(Phase::Error, &msg);
                                return ExtractedDocument::error(msg);
                            }
                        }
                    }
                }
                Ok(response) if response.status == 429 => {
                    if self.retry.has_attempts_remaining(attempt) {
                        tracing::warn!(attempt, "OCR rate limit hit, backing off");
                        status.update(Phase::Waiting, "Rate limit reached, retrying...");
                    } else {
                        let msg =
                            "Rate limit reached. Could not process the document after retries."
                                .to_string();
                        tracing::error!("{msg}");
                        status.update(Phase::Error, &msg);
                        return ExtractedDocument::error(msg).with_raw_response(
                            serde_json::Value::String(response.body),
                        );
                    }
                }
                Ok(response) => {
                    let body_prefix: String = response.body.chars().take(500).collect();
                    let msg = format!("OCR API error ({}): {body_prefix}", response.status);
                    tracing::error!("{msg}");
                    status.update(Phase::Error, &msg);
                    return ExtractedDocument::error(msg);
                }
                Err(OcrError::Timeout) => {
                    if self.retry.has_attempts_remaining(attempt) {
                        tracing::warn!(attempt, "timeout contacting OCR API, backing off");
                        status.update(Phase::Waiting, "Timeout, retrying...");
                    } else {
                        let msg = "Timeout contacting the OCR API after retries".to_string();
                        tracing::error!("{msg}");
                        status.update(Phase::Error, &msg);
                        return ExtractedDocument::error(msg);
                    }
                }
                Err(e) => {
                    if self.retry.has_attempts_remaining(attempt) {
                        tracing::warn!(attempt, error = %e, "OCR request failed, backing off");
                        status.update(Phase::Waiting, "Error, retrying...");
                    } else {
                        let msg = format!("Error after retries: {e}");
                        tracing::error!("{msg}");
                        status.update(Phase::Error, &msg);
                        return ExtractedDocument::error(msg);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::document::ExtractedFormat;
    use docchat_core::status::NullStatusSink;
    use std::sync::Mutex;

    /// Transport that replays a scripted list of outcomes
    struct ScriptedTransport {
        script: Mutex<Vec<Result<OcrHttpResponse>>>,
        attempts: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<OcrHttpResponse>>) -> Self {
            let mut script = script;
            script.reverse();
            Self {
                script: Mutex::new(script),
                attempts: Mutex::new(0),
            }
        }

        fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl OcrTransport for ScriptedTransport {
        async fn submit(&self, _request: &OcrRequest) -> Result<OcrHttpResponse> {
            *self.attempts.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop()
                .expect("transport called more times than scripted")
        }
    }

    fn ok(body: &str) -> Result<OcrHttpResponse> {
        Ok(OcrHttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status(code: u16) -> Result<OcrHttpResponse> {
        Ok(OcrHttpResponse {
            status: code,
            body: "limit".to_string(),
        })
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::linear(Duration::from_millis(1), 3)
    }

    #[tokio::test]
    async fn test_success_normalizes_body() {
        let transport = ScriptedTransport::new(vec![ok(r#"{"text": "hello"}"#)]);
        let client = OcrClient::with_transport(transport).with_retry_policy(fast_policy());
        let doc = client
            .process(OcrPayload::document("text/plain", b"x"), &NullStatusSink)
            .await;
        assert_eq!(doc.text, "hello");
        assert_eq!(doc.format, ExtractedFormat::Text);
    }

    #[tokio::test]
    async fn test_three_429s_exhaust_exactly_three_attempts() {
        let transport = ScriptedTransport::new(vec![status(429), status(429), status(429)]);
        let client = OcrClient::with_transport(transport).with_retry_policy(fast_policy());
        let doc = client
            .process(OcrPayload::document("text/plain", b"x"), &NullStatusSink)
            .await;
        assert!(doc.is_error());
        assert!(doc.error.unwrap().contains("Rate limit"));
        assert_eq!(client.transport.attempts(), 3);
    }

    #[tokio::test]
    async fn test_429_then_success() {
        let transport = ScriptedTransport::new(vec![status(429), ok(r#"{"text": "late"}"#)]);
        let client = OcrClient::with_transport(transport).with_retry_policy(fast_policy());
        let doc = client
            .process(OcrPayload::image("image/png", b"x"), &NullStatusSink)
            .await;
        assert_eq!(doc.text, "late");
        assert_eq!(client.transport.attempts(), 2);
    }

    #[tokio::test]
    async fn test_other_status_is_terminal_no_retry() {
        let transport = ScriptedTransport::new(vec![status(500)]);
        let client = OcrClient::with_transport(transport).with_retry_policy(fast_policy());
        let doc = client
            .process(OcrPayload::document("application/pdf", b"x"), &NullStatusSink)
            .await;
        assert!(doc.is_error());
        assert!(doc.error.unwrap().contains("500"));
        assert_eq!(client.transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_parse_failure_retried_within_budget() {
        let transport =
            ScriptedTransport::new(vec![ok("not json"), ok("{{"), ok(r#"{"text": "ok"}"#)]);
        let client = OcrClient::with_transport(transport).with_retry_policy(fast_policy());
        let doc = client
            .process(OcrPayload::document("text/plain", b"x"), &NullStatusSink)
            .await;
        assert_eq!(doc.text, "ok");
        assert_eq!(client.transport.attempts(), 3);
    }

    #[tokio::test]
    async fn test_timeouts_exhaust_budget() {
        let transport = ScriptedTransport::new(vec![
            Err(OcrError::Timeout),
            Err(OcrError::Timeout),
            Err(OcrError::Timeout),
        ]);
        let client = OcrClient::with_transport(transport).with_retry_policy(fast_policy());
        let doc = client
            .process(OcrPayload::document("text/plain", b"x"), &NullStatusSink)
            .await;
        assert!(doc.is_error());
        assert!(doc.error.unwrap().contains("Timeout"));
        assert_eq!(client.transport.attempts(), 3);
    }

    #[tokio::test]
    async fn test_empty_object_body_is_no_content_error() {
        let transport = ScriptedTransport::new(vec![ok("{}")]);
        let client = OcrClient::with_transport(transport).with_retry_policy(fast_policy());
        let doc = client
            .process(OcrPayload::document("application/pdf", b"x"), &NullStatusSink)
            .await;
        assert!(doc.is_error());
        assert!(doc.error.unwrap().contains("no content"));
    }

    #[test]
    fn test_payload_serialization() {
        let payload = OcrPayload::document("application/pdf", b"pdf-bytes");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "document_url");
        assert!(json["document_url"]
            .as_str()
            .unwrap()
            .starts_with("data:application/pdf;base64,"));

        let payload = OcrPayload::image("image/png", b"png-bytes");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "image_url");
        assert!(json["image_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }
}
