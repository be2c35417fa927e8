//! # tax-notice-analyzer
//!
//! Read IRS tax-notice PDFs and summarise them as structured JSON.
//!
//! Digitally authored notices carry a text layer that can be read directly.
//! Scanned notices do not, so each page is rasterised and sent to the
//! OCR.space API, one page at a time with a pause between calls. The
//! resulting text is handed to an LLM that fills a fixed JSON schema.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Text     read the embedded text layer (pdfium, spawn_blocking)
//!  │              └─ more than 100 chars? done, source = digital
//!  ├─ 2. Render   rasterise every page at 200 DPI (pdfium, spawn_blocking)
//!  ├─ 3. Encode   PNG, one reduced re-encode when over 1 MiB
//!  ├─ 4. OCR      sequential OCR.space calls, 500 ms apart; failed pages skipped
//!  ├─ 5. Join     "--- Page N ---" blocks, source = ocr
//!  └─ 6. Summary  LLM call (45 s deadline), fence strip, JSON parse
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tax_notice_analyzer::{AnalyzerConfig, Document, Extractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::builder()
//!         .ocr_api_key(std::env::var("OCR_SPACE_API_KEY")?)
//!         .build()?;
//!     let extractor = Extractor::new(config)?;
//!     let bytes = std::fs::read("notice.pdf")?;
//!     let result = extractor.extract(&Document::from(bytes)).await?;
//!     println!("[{}] {}", result.source.as_str(), result.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `notice2text` binary (clap, indicatif, tracing-subscriber) |
//! | `server` | on      | The [`server`] module and the `tax-notice-server` binary (axum, tower-http) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, Capabilities};
pub use error::{AnalyzerError, OcrError};
pub use extract::Extractor;
pub use output::{Document, ExtractionResult, ExtractionStats, PageImage, PageResult, TextSource};
pub use pipeline::llm::{LlmSummarizer, Summarizer};
pub use progress::{ExtractionProgress, NoopProgress, ProgressCallback};
pub use store::{PasswordHasher, StoreError, UserStore};
