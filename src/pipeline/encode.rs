//! Image encoding: `DynamicImage` → bytes + base64 data-URI for the OCR form.
//!
//! Pages are sent as lossless PNG. The OCR service rejects payloads above
//! 1 MiB, so a page whose PNG exceeds the limit is re-encoded exactly once at
//! reduced quality: scaled to `reduced_quality` percent of its size, reduced
//! to 8-bit grayscale, and compressed at the highest PNG level. The payload
//! stays `image/png` either way. If the reduced PNG is still too large the
//! smaller of the two encodings is submitted anyway; the service may then
//! reject it, which the caller handles like any other page failure.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::{debug, warn};

/// Payload type of an OCR submission, mapped to the form's `filetype` and
/// the data-URI content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Pdf,
    Png,
}

impl PayloadKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            PayloadKind::Pdf => "application/pdf",
            PayloadKind::Png => "image/png",
        }
    }

    /// Value of the `filetype` form field.
    pub fn filetype(&self) -> &'static str {
        match self {
            PayloadKind::Pdf => "PDF",
            PayloadKind::Png => "PNG",
        }
    }
}

/// Bytes ready for submission.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub kind: PayloadKind,
    pub bytes: Vec<u8>,
    /// True when the size policy replaced the first encoding.
    pub reencoded: bool,
}

impl EncodedPayload {
    /// Wrap a whole PDF for submission.
    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self {
            kind: PayloadKind::Pdf,
            bytes,
            reencoded: false,
        }
    }

    /// `data:<mime>;base64,<payload>` as expected by the `base64Image` field.
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.kind.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Encode a page image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a page image as a reduced PNG: scaled to `quality` percent
/// (1–100) per side, 8-bit grayscale, best compression.
pub fn encode_reduced_png(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let (w, h) = reduced_dimensions(img.width(), img.height(), quality);
    let gray = DynamicImage::ImageLuma8(img.resize_exact(w, h, FilterType::Triangle).to_luma8());

    let mut buf = Vec::new();
    gray.write_with_encoder(PngEncoder::new_with_quality(
        &mut buf,
        CompressionType::Best,
        PngFilter::Adaptive,
    ))?;
    Ok(buf)
}

/// Pixel size after scaling each side to `quality` percent; never below 1.
pub fn reduced_dimensions(width: u32, height: u32, quality: u8) -> (u32, u32) {
    let pct = u64::from(quality.clamp(1, 100));
    let scale = |side: u32| ((u64::from(side) * pct / 100) as u32).max(1);
    (scale(width), scale(height))
}

/// Encode a page for OCR under a size limit.
///
/// Exactly one re-encode is attempted when the PNG exceeds `max_bytes`.
pub fn encode_for_ocr(
    img: &DynamicImage,
    max_bytes: usize,
    reduced_quality: u8,
) -> Result<EncodedPayload, image::ImageError> {
    let png = encode_png(img)?;
    if png.len() <= max_bytes {
        debug!(bytes = png.len(), "Encoded page as PNG");
        return Ok(EncodedPayload {
            kind: PayloadKind::Png,
            bytes: png,
            reencoded: false,
        });
    }

    let reduced = encode_reduced_png(img, reduced_quality)?;
    debug!(
        png_bytes = png.len(),
        reduced_bytes = reduced.len(),
        quality = reduced_quality,
        "Page over size limit, re-encoded at reduced quality"
    );

    let bytes = if reduced.len() <= png.len() { reduced } else { png };
    if bytes.len() > max_bytes {
        warn!(
            bytes = bytes.len(),
            limit = max_bytes,
            "Page still over size limit after re-encode; submitting anyway"
        );
    }

    Ok(EncodedPayload {
        kind: PayloadKind::Png,
        bytes,
        reencoded: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};

    fn noisy_image(w: u32, h: u32) -> DynamicImage {
        // Deterministic LCG noise: compresses poorly as PNG.
        let mut state: u32 = 0x1234_5678;
        let img = RgbImage::from_fn(w, h, |_, _| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let b = state.to_le_bytes();
            Rgb([b[1], b[2], b[3]])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn small_image_stays_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let payload = encode_for_ocr(&img, 1024 * 1024, 60).expect("encode should succeed");
        assert_eq!(payload.kind, PayloadKind::Png);
        assert!(!payload.reencoded);
        assert!(payload.bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn oversized_png_is_reencoded_once_as_smaller_png() {
        let img = noisy_image(128, 128);
        let png_len = encode_png(&img).unwrap().len();
        let payload = encode_for_ocr(&img, png_len - 1, 60).unwrap();
        assert!(payload.reencoded);
        assert_eq!(payload.kind, PayloadKind::Png);
        assert!(payload.bytes.len() < png_len);
        assert!(payload.bytes.starts_with(&[0x89, b'P', b'N', b'G']));

        let decoded = image::load_from_memory(&payload.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (76, 76));
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn still_oversized_is_submitted_with_smaller_encoding() {
        let img = noisy_image(64, 64);
        let payload = encode_for_ocr(&img, 16, 60).unwrap();
        assert!(payload.reencoded);
        assert_eq!(payload.kind, PayloadKind::Png);
        assert!(payload.bytes.len() > 16);
        let png_len = encode_png(&img).unwrap().len();
        assert!(payload.bytes.len() <= png_len);
    }

    #[test]
    fn reduced_dimensions_scale_by_percent() {
        assert_eq!(reduced_dimensions(1700, 2200, 60), (1020, 1320));
        assert_eq!(reduced_dimensions(1, 1, 60), (1, 1));
        assert_eq!(reduced_dimensions(300, 200, 100), (300, 200));
    }

    #[test]
    fn data_uri_prefixes() {
        let png = EncodedPayload {
            kind: PayloadKind::Png,
            bytes: vec![1, 2, 3],
            reencoded: false,
        };
        assert_eq!(png.data_uri(), "data:image/png;base64,AQID");
        assert_eq!(png.kind.filetype(), "PNG");

        let pdf = EncodedPayload::pdf(b"%PDF".to_vec());
        assert!(pdf.data_uri().starts_with("data:application/pdf;base64,"));
        assert_eq!(pdf.kind.filetype(), "PDF");
    }
}
