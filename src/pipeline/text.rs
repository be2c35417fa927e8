//! Digital text extraction: read the PDF's own text layer via pdfium.
//!
//! Page texts are concatenated in page order with no separator, so the
//! result is exactly what the text layer contains. Whether that text is
//! "meaningful" is decided by the orchestrator, not here.

use crate::error::AnalyzerError;
use crate::output::Document;
use crate::pipeline::pdfium::bind_pdfium;
use std::path::PathBuf;
use tracing::debug;

/// Reads the embedded text of a PDF.
///
/// Implementations are blocking; the orchestrator calls them from
/// `spawn_blocking`.
pub trait TextLayer: Send + Sync {
    /// Concatenated text of every page, in page order.
    fn extract_text(&self, document: &Document) -> Result<String, AnalyzerError>;
}

/// [`TextLayer`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextLayer {
    lib_path: Option<PathBuf>,
}

impl PdfiumTextLayer {
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }
}

impl TextLayer for PdfiumTextLayer {
    fn extract_text(&self, document: &Document) -> Result<String, AnalyzerError> {
        let pdfium = bind_pdfium(self.lib_path.as_deref())?;

        // The document handle borrows `pdfium` and is dropped at the end of
        // this scope, before the text is returned.
        let doc = pdfium
            .load_pdf_from_byte_slice(document.as_bytes(), None)
            .map_err(|e| AnalyzerError::CorruptPdf {
                detail: format!("{e:?}"),
            })?;

        let mut text = String::new();
        for (idx, page) in doc.pages().iter().enumerate() {
            let page_text = page.text().map_err(|e| AnalyzerError::CorruptPdf {
                detail: format!("page {}: {e:?}", idx + 1),
            })?;
            text.push_str(&page_text.all());
        }

        debug!(chars = text.chars().count(), "Read text layer");
        Ok(text)
    }
}

/// True when `text`, stripped, is longer than `threshold` characters.
pub fn is_meaningful(text: &str, threshold: usize) -> bool {
    text.trim().chars().count() > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strictly_greater() {
        let exactly = "a".repeat(100);
        assert!(!is_meaningful(&exactly, 100));
        let over = "a".repeat(101);
        assert!(is_meaningful(&over, 100));
    }

    #[test]
    fn surrounding_whitespace_does_not_count() {
        let padded = format!("   \n{}\n\t  ", "b".repeat(100));
        assert!(!is_meaningful(&padded, 100));
        assert!(!is_meaningful("", 100));
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 60 two-byte characters: 120 bytes but only 60 chars
        let s = "é".repeat(60);
        assert!(!is_meaningful(&s, 100));
    }

    #[test]
    fn unparseable_bytes_fail_when_pdfium_available() {
        if std::env::var("PDFIUM_TESTS").is_err() {
            println!("SKIP: set PDFIUM_TESTS=1 to run pdfium-backed tests");
            return;
        }
        let layer = PdfiumTextLayer::default();
        let result = layer.extract_text(&Document::from(b"not a pdf".to_vec()));
        assert!(result.is_err());
    }
}
