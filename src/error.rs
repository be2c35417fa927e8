//! Error types for the tax-notice-analyzer library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AnalyzerError`]: **Fatal**: the request cannot produce a result
//!   (PDFium not available, the PDF cannot be rasterised, no page yielded any
//!   text, the summariser failed). Returned as `Err(AnalyzerError)`.
//!
//! * [`OcrError`]: **Non-fatal**: a single page could not be recognised
//!   (missing key, network error, service-side failure). Stored inside
//!   [`crate::output::PageResult`]; the batch carries on with the next page.
//!
//! Every remote-call wrapper returns one of these as a typed result so the
//! orchestrator can match on the kind instead of catching and logging blindly.

use thiserror::Error;

/// All fatal errors returned by the tax-notice-analyzer library.
///
/// Page-level OCR failures use [`OcrError`] and never surface here.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: String },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The bytes were read but do not start with the `%PDF` magic.
    #[error("Input is not a PDF: '{input}' (first bytes: {magic:?})")]
    NotAPdf { input: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDFium could not parse the document (digital text path).
    #[error("PDF could not be parsed: {detail}")]
    CorruptPdf { detail: String },

    /// The document could not be turned into page images; OCR is impossible.
    #[error("Rasterisation failed: {detail}")]
    RasterisationFailed { detail: String },

    /// Neither the text layer nor any OCR'd page produced usable text.
    #[error("No text could be extracted ({succeeded}/{attempted} pages recognised)")]
    NoTextExtracted { attempted: usize, succeeded: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured: {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM call exceeded its deadline.
    #[error("LLM call timed out after {secs}s")]
    LlmTimeout { secs: u64 },

    /// The LLM answered, but not with a JSON document.
    #[error("LLM returned an invalid summary: {detail}")]
    InvalidSummary { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzerError {
    /// True when the failure means "no text could be extracted" for the caller.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            AnalyzerError::RasterisationFailed { .. }
                | AnalyzerError::NoTextExtracted { .. }
                | AnalyzerError::PdfiumBindingFailed(_)
                | AnalyzerError::CorruptPdf { .. }
        )
    }
}

/// A non-fatal error for a single page's OCR call.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum OcrError {
    /// No OCR API key configured; no request was sent.
    #[error("OCR API key is not configured")]
    MissingCredential,

    /// The page image could not be encoded for transport.
    #[error("page image could not be encoded: {0}")]
    Encode(String),

    /// Connection, TLS or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded the per-call deadline.
    #[error("OCR request timed out after {0}s")]
    Timeout(u64),

    /// The service answered with a non-2xx status.
    #[error("OCR service returned HTTP {0}")]
    HttpStatus(u16),

    /// The body was not the expected JSON shape.
    #[error("malformed OCR response: {0}")]
    MalformedResponse(String),

    /// The service flagged `IsErroredOnProcessing`.
    #[error("OCR processing error: {0}")]
    Processing(String),

    /// The service succeeded but recognised nothing on the page.
    #[error("no text recognised on page")]
    NoText,
}

impl OcrError {
    /// Short, stable label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            OcrError::MissingCredential => "missing_credential",
            OcrError::Encode(_) => "encode",
            OcrError::Transport(_) => "transport",
            OcrError::Timeout(_) => "timeout",
            OcrError::HttpStatus(_) => "http_status",
            OcrError::MalformedResponse(_) => "malformed_response",
            OcrError::Processing(_) => "processing",
            OcrError::NoText => "no_text",
        }
    }
}
