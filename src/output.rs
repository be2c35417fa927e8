//! Data carried through one extraction: the input document, page images,
//! per-page OCR outcomes and the final result.
//!
//! Everything here lives for a single request. Nothing is cached or shared
//! across requests.

use crate::error::OcrError;
use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The uploaded PDF as an immutable byte buffer.
///
/// Cloning is cheap (reference counted), which lets the blocking PDFium
/// stages take their own handle without copying the upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    bytes: Arc<[u8]>,
}

impl Document {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the buffer starts with the `%PDF` magic.
    pub fn has_pdf_magic(&self) -> bool {
        self.bytes.starts_with(b"%PDF")
    }
}

impl From<Vec<u8>> for Document {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for Document {
    fn from(v: &[u8]) -> Self {
        Self::new(v)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document").field("len", &self.len()).finish()
    }
}

/// One rasterised page, owned by the orchestrator until it has been OCR'd.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 0-based position in the document.
    pub index: usize,
    pub image: DynamicImage,
}

impl PageImage {
    /// 1-based page number used in headers and logs.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }
}

/// Outcome of OCR for a single page. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    /// 1-based page number.
    pub page_num: usize,
    /// Recognised text; `None` when the page was skipped.
    pub text: Option<String>,
    /// Why the page was skipped.
    pub error: Option<OcrError>,
    pub duration_ms: u64,
}

impl PageResult {
    pub fn succeeded(&self) -> bool {
        self.text.is_some()
    }
}

/// Where the final text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    /// The PDF's own text layer.
    Digital,
    /// Per-page OCR of the rasterised document.
    Ocr,
}

impl TextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextSource::Digital => "digital",
            TextSource::Ocr => "ocr",
        }
    }
}

/// Counters for one extraction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionStats {
    /// Pages submitted to OCR (0 on the digital path).
    pub pages_attempted: usize,
    /// Pages that returned text.
    pub pages_succeeded: usize,
    /// Inter-page pauses issued by the OCR scheduler.
    pub delays_issued: usize,
    pub duration_ms: u64,
}

/// The extracted text handed to the summariser.
///
/// Only successful extractions are represented; a total failure is an
/// `Err(AnalyzerError)` instead, so `text` is never empty here.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub source: TextSource,
    /// Per-page OCR outcomes in page order (empty on the digital path).
    pub pages: Vec<PageResult>,
    pub stats: ExtractionStats,
}

impl ExtractionResult {
    /// True when OCR succeeded overall but skipped at least one page.
    pub fn is_partial(&self) -> bool {
        self.source == TextSource::Ocr && self.stats.pages_succeeded < self.stats.pages_attempted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_magic_and_len() {
        let doc = Document::from(b"%PDF-1.7\n".as_slice());
        assert!(doc.has_pdf_magic());
        assert_eq!(doc.len(), 9);

        let empty = Document::from(Vec::new());
        assert!(empty.is_empty());
        assert!(!empty.has_pdf_magic());
        assert_eq!(format!("{empty:?}"), "Document { len: 0 }");
    }

    #[test]
    fn text_source_serialises_lowercase() {
        assert_eq!(serde_json::to_value(TextSource::Ocr).unwrap(), "ocr");
        assert_eq!(TextSource::Digital.as_str(), "digital");
    }

    #[test]
    fn partial_only_on_ocr_with_gaps() {
        let mut result = ExtractionResult {
            text: "x".into(),
            source: TextSource::Ocr,
            pages: vec![],
            stats: ExtractionStats {
                pages_attempted: 3,
                pages_succeeded: 2,
                ..Default::default()
            },
        };
        assert!(result.is_partial());
        result.stats.pages_succeeded = 3;
        assert!(!result.is_partial());
    }
}
