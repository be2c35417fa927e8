//! Page OCR: submit one page image to the OCR.space parse endpoint.
//!
//! The wire contract is fixed: a form-encoded POST with `apikey`,
//! `base64Image` (a data-URI), `filetype`, and the options
//! `detectOrientation=true`, `isCreateSearchablePdf=false`, `scale=true`,
//! `isTable=true`, `OCREngine=2`. The response is
//! `{IsErroredOnProcessing, ErrorMessage?, ParsedResults: [{ParsedText}]}`.
//!
//! Every failure comes back as a typed [`OcrError`]; nothing here aborts the
//! batch. Each call issues at most one request: the size-driven re-encode in
//! [`crate::pipeline::encode`] happens before submission and is not a retry.

use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, OcrError};
use crate::output::PageImage;
use crate::pipeline::encode::{encode_for_ocr, EncodedPayload};
use crate::pipeline::postprocess::clean_page_text;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Recognises the text on one page image.
#[async_trait]
pub trait PageOcr: Send + Sync {
    async fn recognize(&self, page: &PageImage) -> Result<String, OcrError>;
}

/// HTTP client for the OCR.space API.
#[derive(Debug, Clone)]
pub struct OcrSpaceClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
    max_payload_bytes: usize,
    reduced_quality: u8,
}

impl OcrSpaceClient {
    pub fn new(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build()
            .map_err(|e| AnalyzerError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.ocr_endpoint.clone(),
            api_key: config
                .ocr_api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            timeout_secs: config.ocr_timeout_secs,
            max_payload_bytes: config.ocr_max_payload_bytes,
            reduced_quality: config.ocr_reduced_quality,
        })
    }

    /// Submit an already-encoded payload (page image or whole PDF).
    pub async fn submit(&self, payload: &EncodedPayload) -> Result<String, OcrError> {
        let api_key = self.api_key.as_deref().ok_or(OcrError::MissingCredential)?;

        let form = form_fields(api_key, payload);
        let response = self
            .http
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.map_transport(e))?;
        parse_response(&body)
    }

    fn map_transport(&self, e: reqwest::Error) -> OcrError {
        if e.is_timeout() {
            OcrError::Timeout(self.timeout_secs)
        } else {
            OcrError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl PageOcr for OcrSpaceClient {
    async fn recognize(&self, page: &PageImage) -> Result<String, OcrError> {
        if self.api_key.is_none() {
            return Err(OcrError::MissingCredential);
        }

        let payload = encode_for_ocr(&page.image, self.max_payload_bytes, self.reduced_quality)
            .map_err(|e| OcrError::Encode(e.to_string()))?;
        debug!(
            page = page.page_num(),
            bytes = payload.bytes.len(),
            filetype = payload.kind.filetype(),
            reencoded = payload.reencoded,
            "Submitting page to OCR"
        );

        self.submit(&payload).await
    }
}

/// Form body for one submission, in the order the service documents it.
pub fn form_fields(api_key: &str, payload: &EncodedPayload) -> Vec<(&'static str, String)> {
    vec![
        ("apikey", api_key.to_string()),
        ("base64Image", payload.data_uri()),
        ("filetype", payload.kind.filetype().to_string()),
        ("detectOrientation", "true".to_string()),
        ("isCreateSearchablePdf", "false".to_string()),
        ("scale", "true".to_string()),
        ("isTable", "true".to_string()),
        ("OCREngine", "2".to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored: bool,
    /// A string or an array of strings depending on the failure.
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<serde_json::Value>,
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Option<Vec<ParsedResult>>,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: Option<String>,
}

/// Interpret an OCR.space response body.
pub fn parse_response(body: &str) -> Result<String, OcrError> {
    let parsed: OcrResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::MalformedResponse(e.to_string()))?;

    if parsed.is_errored {
        let message = parsed
            .error_message
            .as_ref()
            .map(render_error_message)
            .unwrap_or_else(|| "unknown error".to_string());
        warn!(error = %message, "OCR service reported a processing error");
        return Err(OcrError::Processing(message));
    }

    let results = parsed
        .parsed_results
        .filter(|r| !r.is_empty())
        .ok_or_else(|| OcrError::MalformedResponse("no ParsedResults".into()))?;

    let text = results
        .iter()
        .filter_map(|r| r.parsed_text.as_deref())
        .map(clean_page_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        return Err(OcrError::NoText);
    }
    Ok(text)
}

fn render_error_message(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::PayloadKind;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn blank_page() -> PageImage {
        PageImage {
            index: 0,
            image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255; 4]))),
        }
    }

    #[test]
    fn form_fields_match_wire_contract() {
        let payload = EncodedPayload {
            kind: PayloadKind::Png,
            bytes: vec![0xAB],
            reencoded: false,
        };
        let fields = form_fields("K42", &payload);
        let get = |k: &str| {
            fields
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("apikey"), Some("K42"));
        assert_eq!(get("base64Image"), Some("data:image/png;base64,qw=="));
        assert_eq!(get("filetype"), Some("PNG"));
        assert_eq!(get("detectOrientation"), Some("true"));
        assert_eq!(get("isCreateSearchablePdf"), Some("false"));
        assert_eq!(get("scale"), Some("true"));
        assert_eq!(get("isTable"), Some("true"));
        assert_eq!(get("OCREngine"), Some("2"));
        assert_eq!(fields.len(), 8);
    }

    #[test]
    fn parses_successful_response() {
        let body = r#"{"IsErroredOnProcessing":false,"ParsedResults":[{"ParsedText":"Notice CP14\r\nAmount due: $500.73\r\n"}]}"#;
        assert_eq!(
            parse_response(body).unwrap(),
            "Notice CP14\nAmount due: $500.73"
        );
    }

    #[test]
    fn processing_error_with_array_message() {
        let body = r#"{"IsErroredOnProcessing":true,"ErrorMessage":["File failed validation.","Too large"]}"#;
        assert_eq!(
            parse_response(body).unwrap_err(),
            OcrError::Processing("File failed validation.; Too large".into())
        );
    }

    #[test]
    fn processing_error_with_string_message() {
        let body = r#"{"IsErroredOnProcessing":true,"ErrorMessage":"Timed out waiting for results"}"#;
        assert_eq!(
            parse_response(body).unwrap_err(),
            OcrError::Processing("Timed out waiting for results".into())
        );
    }

    #[test]
    fn malformed_bodies() {
        assert!(matches!(
            parse_response("<html>bad gateway</html>"),
            Err(OcrError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"IsErroredOnProcessing":false,"ParsedResults":[]}"#),
            Err(OcrError::MalformedResponse(_))
        ));
    }

    #[test]
    fn blank_text_is_no_text() {
        let body = r#"{"IsErroredOnProcessing":false,"ParsedResults":[{"ParsedText":" \r\n "}]}"#;
        assert_eq!(parse_response(body).unwrap_err(), OcrError::NoText);
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        // Port 9 (discard) is never contacted: the key check comes first.
        let config = AnalyzerConfig::builder()
            .ocr_endpoint("http://127.0.0.1:9/parse/image")
            .build()
            .unwrap();
        let client = OcrSpaceClient::new(&config).unwrap();
        assert_eq!(
            client.recognize(&blank_page()).await.unwrap_err(),
            OcrError::MissingCredential
        );
    }
}
