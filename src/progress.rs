//! Progress-callback trait for per-page OCR events.
//!
//! Inject an [`Arc<dyn ExtractionProgress>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to observe the
//! OCR loop as it walks a scanned notice. Digital notices never fire these
//! events; they finish in a single step.
//!
//! # Example
//!
//! ```rust
//! use tax_notice_analyzer::{AnalyzerConfig, ExtractionProgress};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl ExtractionProgress for Counter {
//!     fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _chars: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator while it OCRs a scanned document.
///
/// All methods default to no-ops. Pages are processed sequentially, so
/// events for one document never interleave.
pub trait ExtractionProgress: Send + Sync {
    /// Called once after rasterisation, before the first OCR call.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the OCR request for a page (1-indexed).
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page produced text.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, chars: usize) {
        let _ = (page_num, total_pages, chars);
    }

    /// Called when a page was skipped.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl ExtractionProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgress>;
