//! Pipeline stages for tax-notice text extraction and summarisation.
//!
//! Each submodule implements exactly one step. The PDFium-backed stages sit
//! behind small traits ([`text::TextLayer`], [`render::PageRasterizer`],
//! [`ocr::PageOcr`], [`llm::Summarizer`]) so the orchestrator can be driven
//! with in-memory fakes.
//!
//! ## Data Flow
//!
//! ```text
//!                ┌──▶ text (meaningful?) ─────────────────────────┐
//! input ─────────┤                                                ├──▶ llm ──▶ postprocess
//! (path/URL/     └──▶ render ──▶ encode ──▶ ocr (paced) ──────────┘
//!  upload)           (pdfium)   (PNG)       (OCR.space)
//! ```
//!
//! 1. [`input`]: load a path or URL into a [`crate::output::Document`]
//! 2. [`text`]: read the embedded text layer; accepted above the threshold
//! 3. [`render`]: rasterise every page; blocking, run in `spawn_blocking`
//! 4. [`encode`]: PNG, re-encoded once at reduced quality when over the size limit
//! 5. [`ocr`]: one OCR.space call per page
//! 6. [`pacing`]: sequential scheduling with a pause between calls
//! 7. [`llm`] and [`postprocess`]: summarise, strip fences, parse JSON

pub mod encode;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pacing;
pub mod pdfium;
pub mod postprocess;
pub mod render;
pub mod text;
