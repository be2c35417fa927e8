//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! Rendering is CPU-bound and pdfium keeps thread-local state, so the
//! orchestrator runs [`PageRasterizer::rasterize`] inside `spawn_blocking`.
//! Pages are rendered at the configured DPI (200 by default), with the
//! longest edge capped at `max_rendered_pixels` to keep memory bounded on
//! oversized pages.

use crate::error::AnalyzerError;
use crate::output::{Document, PageImage};
use crate::pipeline::pdfium::bind_pdfium;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Turns a PDF into one image per page, in page order.
pub trait PageRasterizer: Send + Sync {
    /// Render all pages. Any failure aborts the whole rasterisation: a
    /// document that cannot be fully rendered cannot be OCR'd in order.
    fn rasterize(&self, document: &Document) -> Result<Vec<PageImage>, AnalyzerError>;
}

/// [`PageRasterizer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
    lib_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(dpi: u32, max_pixels: u32, lib_path: Option<PathBuf>) -> Self {
        Self {
            dpi,
            max_pixels,
            lib_path,
        }
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, document: &Document) -> Result<Vec<PageImage>, AnalyzerError> {
        let pdfium = bind_pdfium(self.lib_path.as_deref())?;

        let doc = pdfium
            .load_pdf_from_byte_slice(document.as_bytes(), None)
            .map_err(|e| AnalyzerError::RasterisationFailed {
                detail: format!("{e:?}"),
            })?;

        let pages = doc.pages();
        let total = pages.len() as usize;
        info!(pages = total, dpi = self.dpi, "Rasterising PDF");

        let mut images = Vec::with_capacity(total);
        for (index, page) in pages.iter().enumerate() {
            let (w, h) = render_dimensions(
                page.width().value,
                page.height().value,
                self.dpi,
                self.max_pixels,
            );

            let render_config = PdfRenderConfig::new()
                .set_target_width(w as i32)
                .set_maximum_height(h as i32);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                AnalyzerError::RasterisationFailed {
                    detail: format!("page {}: {e:?}", index + 1),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                page = index + 1,
                width = image.width(),
                height = image.height(),
                "Rendered page"
            );
            images.push(PageImage { index, image });
        }

        Ok(images)
    }
}

/// Pixel size for a page of `width_pt` × `height_pt` points at `dpi`.
///
/// Both edges are at least 1 px; if the longest edge exceeds `max_pixels`
/// the page is scaled down preserving aspect ratio.
pub fn render_dimensions(width_pt: f32, height_pt: f32, dpi: u32, max_pixels: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let w = (width_pt * scale).max(1.0);
    let h = (height_pt * scale).max(1.0);

    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let ratio = max_pixels as f32 / longest;
        let capped = (
            ((w * ratio) as u32).clamp(1, max_pixels),
            ((h * ratio) as u32).clamp(1, max_pixels),
        );
        warn!(
            raw_width = w as u32,
            raw_height = h as u32,
            width = capped.0,
            height = capped.1,
            "Page dimensions capped"
        );
        capped
    } else {
        (w as u32, h as u32)
    }
}
