//! Extraction orchestrator: digital text first, per-page OCR as fallback.
//!
//! ```text
//! try digital ──meaningful──▶ Ok(source = digital)
//!      │ not meaningful / parse error
//!      ▼
//! rasterise ──error──▶ Err(RasterisationFailed)
//!      │
//!      ▼
//! OCR page 1 ─ pause ─ OCR page 2 ─ pause ─ … ─ OCR page N
//!      │
//!      ▼
//! any page text? ──yes──▶ Ok(source = ocr)
//!                └─no───▶ Err(NoTextExtracted)
//! ```
//!
//! A page whose OCR call fails is skipped without a placeholder; only the
//! rasteriser and an all-pages failure are fatal.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::output::{Document, ExtractionResult, ExtractionStats, PageImage, PageResult, TextSource};
use crate::pipeline::ocr::{OcrSpaceClient, PageOcr};
use crate::pipeline::pacing::Pacer;
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer};
use crate::pipeline::text::{is_meaningful, PdfiumTextLayer, TextLayer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives one document through the extraction state machine.
///
/// Holds no per-request state; one instance serves every request.
#[derive(Clone)]
pub struct Extractor {
    text_layer: Arc<dyn TextLayer>,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn PageOcr>,
    config: AnalyzerConfig,
}

impl Extractor {
    /// PDFium text layer and rasteriser, OCR.space client.
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let lib = config.pdfium_lib_path.clone();
        let ocr = OcrSpaceClient::new(&config)?;
        Ok(Self {
            text_layer: Arc::new(PdfiumTextLayer::new(lib.clone())),
            rasterizer: Arc::new(PdfiumRasterizer::new(
                config.dpi,
                config.max_rendered_pixels,
                lib,
            )),
            ocr: Arc::new(ocr),
            config,
        })
    }

    /// Assemble an extractor from explicit components.
    pub fn with_components(
        text_layer: Arc<dyn TextLayer>,
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<dyn PageOcr>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            ocr,
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Extract the text of `document`.
    ///
    /// # Errors
    /// * [`AnalyzerError::RasterisationFailed`] when the document cannot be
    ///   rasterised (no OCR call is made).
    /// * [`AnalyzerError::NoTextExtracted`] when every OCR call failed.
    pub async fn extract(&self, document: &Document) -> Result<ExtractionResult, AnalyzerError> {
        let start = Instant::now();
        info!(bytes = document.len(), "Starting extraction");

        // ── Step 1: Digital text layer ───────────────────────────────────────
        if self.config.force_ocr {
            debug!("Text layer skipped (force_ocr)");
        } else if let Some(text) = self.try_digital(document).await {
            let duration_ms = start.elapsed().as_millis() as u64;
            info!(chars = text.chars().count(), duration_ms, "Using digital text layer");
            return Ok(ExtractionResult {
                text,
                source: TextSource::Digital,
                pages: Vec::new(),
                stats: ExtractionStats {
                    duration_ms,
                    ..Default::default()
                },
            });
        }

        // ── Step 2: Rasterise ────────────────────────────────────────────────
        let pages = self.rasterize(document).await.inspect_err(|e| {
            error!(error = %e, "Rasterisation failed; no text could be extracted");
        })?;
        let total = pages.len();
        info!(pages = total, "Rasterised document for OCR");

        // ── Step 3: Paced per-page OCR ───────────────────────────────────────
        let progress = self.config.progress_callback.clone();
        if let Some(cb) = &progress {
            cb.on_extraction_start(total);
        }

        let pacer = Pacer::from_millis(self.config.ocr_page_delay_ms);
        let paced = pacer
            .run(pages, |page| self.ocr_page(page, total))
            .await;
        let results = paced.results;
        let succeeded = results.iter().filter(|r| r.succeeded()).count();

        if let Some(cb) = &progress {
            cb.on_extraction_complete(total, succeeded);
        }

        // ── Step 4: Aggregate ────────────────────────────────────────────────
        let text = assemble_ocr_text(&results);
        let stats = ExtractionStats {
            pages_attempted: total,
            pages_succeeded: succeeded,
            delays_issued: paced.delays,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if text.is_empty() {
            error!(
                attempted = total,
                "No page produced text; no text could be extracted"
            );
            return Err(AnalyzerError::NoTextExtracted {
                attempted: total,
                succeeded,
            });
        }

        info!(
            succeeded,
            attempted = total,
            duration_ms = stats.duration_ms,
            "OCR extraction complete"
        );
        Ok(ExtractionResult {
            text,
            source: TextSource::Ocr,
            pages: results,
            stats,
        })
    }

    /// Meaningful digital text, or `None` to fall back to OCR.
    async fn try_digital(&self, document: &Document) -> Option<String> {
        let layer = Arc::clone(&self.text_layer);
        let doc = document.clone();
        let outcome = tokio::task::spawn_blocking(move || layer.extract_text(&doc)).await;

        match outcome {
            Ok(Ok(text)) if is_meaningful(&text, self.config.meaningful_text_threshold) => {
                Some(text)
            }
            Ok(Ok(text)) => {
                debug!(
                    chars = text.trim().chars().count(),
                    threshold = self.config.meaningful_text_threshold,
                    "Text layer below threshold; treating as scanned"
                );
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Text layer unreadable; falling back to OCR");
                None
            }
            Err(e) => {
                warn!(error = %e, "Text layer task failed; falling back to OCR");
                None
            }
        }
    }

    async fn rasterize(&self, document: &Document) -> Result<Vec<PageImage>, AnalyzerError> {
        let rasterizer = Arc::clone(&self.rasterizer);
        let doc = document.clone();
        tokio::task::spawn_blocking(move || rasterizer.rasterize(&doc))
            .await
            .map_err(|e| AnalyzerError::Internal(format!("rasteriser task panicked: {e}")))?
    }

    async fn ocr_page(&self, page: PageImage, total: usize) -> PageResult {
        let page_num = page.page_num();
        let progress = self.config.progress_callback.as_ref();
        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }

        let start = Instant::now();
        let outcome = self.ocr.recognize(&page).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(text) => {
                debug!(page = page_num, chars = text.len(), duration_ms, "Page recognised");
                if let Some(cb) = progress {
                    cb.on_page_complete(page_num, total, text.chars().count());
                }
                PageResult {
                    page_num,
                    text: Some(text),
                    error: None,
                    duration_ms,
                }
            }
            Err(e) => {
                warn!(
                    page = page_num,
                    kind = e.kind(),
                    error = %e,
                    "OCR failed for page; skipping"
                );
                if let Some(cb) = progress {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
                PageResult {
                    page_num,
                    text: None,
                    error: Some(e),
                    duration_ms,
                }
            }
        }
    }
}

/// Join successful pages as `--- Page N ---` blocks in page order.
///
/// Page text is taken as the OCR client returns it, which is the service's
/// recognised text after [`crate::pipeline::postprocess::clean_page_text`]:
/// CRLF becomes LF, invisible characters are dropped, trailing spaces are
/// trimmed and runs of blank lines collapse. A page's recognised text is
/// therefore contained in the result up to that normalisation.
///
/// Failed pages leave no trace. The result is trimmed, so it is empty
/// exactly when no page carried text.
pub fn assemble_ocr_text(pages: &[PageResult]) -> String {
    pages
        .iter()
        .filter_map(|p| {
            p.text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(|t| format!("--- Page {} ---\n{}", p.page_num, t))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::progress::ExtractionProgress;
    use async_trait::async_trait;
    use image::{DynamicImage, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    // ── Fakes ────────────────────────────────────────────────────────────────

    struct FakeText(Result<String, ()>);

    impl TextLayer for FakeText {
        fn extract_text(&self, _document: &Document) -> Result<String, AnalyzerError> {
            self.0.clone().map_err(|_| AnalyzerError::CorruptPdf {
                detail: "not a PDF".into(),
            })
        }
    }

    /// Produces `pages` blank images, or fails on an empty buffer.
    struct FakeRaster {
        pages: usize,
        calls: AtomicUsize,
    }

    impl FakeRaster {
        fn new(pages: usize) -> Arc<Self> {
            Arc::new(Self {
                pages,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl PageRasterizer for FakeRaster {
        fn rasterize(&self, document: &Document) -> Result<Vec<PageImage>, AnalyzerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if document.is_empty() {
                return Err(AnalyzerError::RasterisationFailed {
                    detail: "empty buffer".into(),
                });
            }
            Ok((0..self.pages)
                .map(|index| PageImage {
                    index,
                    image: DynamicImage::ImageRgba8(RgbaImage::new(2, 2)),
                })
                .collect())
        }
    }

    /// Returns `Page N text` except for the listed failing page numbers.
    struct FakeOcr {
        failing: Vec<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl FakeOcr {
        fn new(failing: &[usize]) -> Arc<Self> {
            Arc::new(Self {
                failing: failing.to_vec(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageOcr for FakeOcr {
        async fn recognize(&self, page: &PageImage) -> Result<String, OcrError> {
            let n = page.page_num();
            self.calls.lock().unwrap().push(n);
            if self.failing.contains(&n) {
                Err(OcrError::Processing("File failed validation".into()))
            } else {
                Ok(format!("Page {n} text"))
            }
        }
    }

    fn extractor(text: Result<String, ()>, raster: Arc<FakeRaster>, ocr: Arc<FakeOcr>) -> Extractor {
        Extractor::with_components(
            Arc::new(FakeText(text)),
            raster,
            ocr,
            AnalyzerConfig::default(),
        )
    }

    fn pdf() -> Document {
        Document::from(b"%PDF-1.7 scanned".as_slice())
    }

    // ── Digital path ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn digital_text_over_threshold_is_returned_verbatim() {
        let text = "x".repeat(150);
        let raster = FakeRaster::new(1);
        let ocr = FakeOcr::new(&[]);
        let ex = extractor(Ok(text.clone()), raster.clone(), ocr.clone());

        let result = ex.extract(&pdf()).await.unwrap();
        assert_eq!(result.source, TextSource::Digital);
        assert_eq!(result.text, text);
        assert_eq!(raster.calls.load(Ordering::SeqCst), 0);
        assert!(ocr.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn short_digital_text_falls_back_to_ocr() {
        let raster = FakeRaster::new(1);
        let ex = extractor(Ok("y".repeat(100)), raster.clone(), FakeOcr::new(&[]));

        let result = ex.extract(&pdf()).await.unwrap();
        assert_eq!(raster.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.source, TextSource::Ocr);
        assert_eq!(result.text, "--- Page 1 ---\nPage 1 text");
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_text_layer_falls_back_to_ocr() {
        let raster = FakeRaster::new(1);
        let ex = extractor(Err(()), raster.clone(), FakeOcr::new(&[]));

        let result = ex.extract(&pdf()).await.unwrap();
        assert_eq!(raster.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.source, TextSource::Ocr);
    }

    #[tokio::test(start_paused = true)]
    async fn force_ocr_skips_text_layer() {
        let config = AnalyzerConfig::builder().force_ocr(true).build().unwrap();
        let raster = FakeRaster::new(1);
        let ex = Extractor::with_components(
            Arc::new(FakeText(Ok("z".repeat(500)))),
            raster.clone(),
            FakeOcr::new(&[]),
            config,
        );
        let result = ex.extract(&pdf()).await.unwrap();
        assert_eq!(result.source, TextSource::Ocr);
    }

    // ── OCR path ─────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn failed_middle_page_is_omitted() {
        let ocr = FakeOcr::new(&[2]);
        let ex = extractor(Ok(String::new()), FakeRaster::new(3), ocr.clone());

        let result = ex.extract(&pdf()).await.unwrap();
        assert_eq!(
            result.text,
            "--- Page 1 ---\nPage 1 text\n\n--- Page 3 ---\nPage 3 text"
        );
        assert!(!result.text.contains("Page 2"));
        assert_eq!(result.stats.pages_succeeded, 2);
        assert_eq!(result.stats.pages_attempted, 3);
        assert!(result.is_partial());
        assert_eq!(ocr.calls(), vec![1, 2, 3]);
        assert!(matches!(
            result.pages[1].error,
            Some(OcrError::Processing(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn every_page_failing_is_total_failure() {
        let ex = extractor(Ok(String::new()), FakeRaster::new(2), FakeOcr::new(&[1, 2]));

        match ex.extract(&pdf()).await {
            Err(AnalyzerError::NoTextExtracted {
                attempted,
                succeeded,
            }) => {
                assert_eq!(attempted, 2);
                assert_eq!(succeeded, 0);
            }
            other => panic!("expected NoTextExtracted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_buffer_fails_before_any_ocr_call() {
        let raster = FakeRaster::new(3);
        let ocr = FakeOcr::new(&[]);
        let ex = extractor(Err(()), raster.clone(), ocr.clone());

        let err = ex.extract(&Document::from(Vec::new())).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::RasterisationFailed { .. }));
        assert!(err.is_extraction_failure());
        assert!(ocr.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_page_document_is_total_failure() {
        let ocr = FakeOcr::new(&[]);
        let ex = extractor(Ok(String::new()), FakeRaster::new(0), ocr.clone());
        let err = ex.extract(&pdf()).await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::NoTextExtracted { attempted: 0, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_pages_only() {
        let ex = extractor(Ok(String::new()), FakeRaster::new(4), FakeOcr::new(&[]));
        let start = tokio::time::Instant::now();

        let result = ex.extract(&pdf()).await.unwrap();
        assert_eq!(result.stats.delays_issued, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn progress_events_follow_pages() {
        #[derive(Default)]
        struct Log(Mutex<Vec<String>>);

        impl ExtractionProgress for Log {
            fn on_extraction_start(&self, total: usize) {
                self.0.lock().unwrap().push(format!("start {total}"));
            }
            fn on_page_complete(&self, page: usize, _total: usize, _chars: usize) {
                self.0.lock().unwrap().push(format!("ok {page}"));
            }
            fn on_page_error(&self, page: usize, _total: usize, _error: &str) {
                self.0.lock().unwrap().push(format!("err {page}"));
            }
            fn on_extraction_complete(&self, total: usize, ok: usize) {
                self.0.lock().unwrap().push(format!("done {ok}/{total}"));
            }
        }

        let log = Arc::new(Log::default());
        let config = AnalyzerConfig::builder()
            .progress_callback(log.clone())
            .build()
            .unwrap();
        let ex = Extractor::with_components(
            Arc::new(FakeText(Ok(String::new()))),
            FakeRaster::new(2),
            FakeOcr::new(&[2]),
            config,
        );
        ex.extract(&pdf()).await.unwrap();

        assert_eq!(
            *log.0.lock().unwrap(),
            vec!["start 2", "ok 1", "err 2", "done 1/2"]
        );
    }

    #[test]
    fn assembly_skips_failed_and_blank_pages() {
        let page = |n: usize, text: Option<&str>| PageResult {
            page_num: n,
            text: text.map(str::to_string),
            error: None,
            duration_ms: 0,
        };
        let pages = vec![page(1, None), page(2, Some("  ")), page(3, Some("Amount due"))];
        assert_eq!(assemble_ocr_text(&pages), "--- Page 3 ---\nAmount due");
        assert_eq!(assemble_ocr_text(&[]), "");
    }

    #[test]
    fn assembled_text_is_normalised_recognition() {
        let raw = r"IRS\u200b Notice\r\nBalance due:   \r\n\r\n\r\n\r\n$500.73\r\n";
        let body = format!(
            r#"{{"IsErroredOnProcessing":false,"ParsedResults":[{{"ParsedText":"{raw}"}}]}}"#
        );
        let text = crate::pipeline::ocr::parse_response(&body).unwrap();
        let pages = vec![PageResult {
            page_num: 1,
            text: Some(text),
            error: None,
            duration_ms: 0,
        }];
        assert_eq!(
            assemble_ocr_text(&pages),
            "--- Page 1 ---\nIRS Notice\nBalance due:\n\n\n$500.73"
        );
    }
}
