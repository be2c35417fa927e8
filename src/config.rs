//! Configuration types for notice extraction and summarisation.
//!
//! All pipeline behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. The config is constructed once at startup
//! and shared read-only with every request; nothing in the pipeline reads
//! process-wide mutable state.
//!
//! [`Capabilities`] records which optional collaborators (database, OCR, LLM)
//! are available. It is computed once when the server starts and handed to
//! the request handlers together with the collaborators themselves.

use crate::error::AnalyzerError;
use crate::progress::ProgressCallback;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Default OCR.space parse endpoint.
pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// Configuration for the extraction pipeline and the summariser.
///
/// # Example
/// ```rust
/// use tax_notice_analyzer::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .dpi(200)
///     .ocr_api_key("K123456789")
///     .ocr_page_delay_ms(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.meaningful_text_threshold, 100);
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Rasterisation DPI for scanned pages. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// Cap on either edge of a rendered page, in pixels. Default: 4000.
    ///
    /// Applied on top of `dpi` so an oversized page (A0 poster) cannot
    /// allocate an unbounded bitmap.
    pub max_rendered_pixels: u32,

    /// The text layer is accepted only when its stripped length exceeds this
    /// many characters. Default: 100.
    ///
    /// Scanned notices often carry a few stray glyphs (producer strings,
    /// barcodes rendered as text); anything at or below the threshold is
    /// treated as scanned.
    pub meaningful_text_threshold: usize,

    /// Skip the text layer and always OCR. Default: false.
    pub force_ocr: bool,

    /// OCR.space API key. `None` makes every OCR call fail without a request.
    pub ocr_api_key: Option<String>,

    /// OCR endpoint URL. Default: [`DEFAULT_OCR_ENDPOINT`].
    pub ocr_endpoint: String,

    /// Encoded page images above this size are re-encoded. Default: 1 MiB.
    pub ocr_max_payload_bytes: usize,

    /// Percent of each side kept by the size-driven re-encode. Default: 60.
    pub ocr_reduced_quality: u8,

    /// Pause between consecutive OCR calls for one document. Default: 500 ms.
    pub ocr_page_delay_ms: u64,

    /// Per-page OCR request timeout. Default: 30 s.
    pub ocr_timeout_secs: u64,

    /// LLM provider name for the summariser. Default: "gemini".
    pub llm_provider: String,

    /// LLM model for the summariser. Default: "gemini-1.5-flash".
    pub llm_model: String,

    /// Sampling temperature for the summariser. Default: 0.1.
    pub llm_temperature: f32,

    /// Maximum output tokens for the summary. Default: 4096.
    pub llm_max_tokens: usize,

    /// Deadline for the summarisation call. Default: 45 s.
    pub llm_timeout_secs: u64,

    /// Explicit pdfium library path; falls back to `PDFIUM_LIB_PATH`, the
    /// executable directory and the system library search path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Per-page OCR progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 4000,
            meaningful_text_threshold: 100,
            force_ocr: false,
            ocr_api_key: None,
            ocr_endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            ocr_max_payload_bytes: 1024 * 1024,
            ocr_reduced_quality: 60,
            ocr_page_delay_ms: 500,
            ocr_timeout_secs: 30,
            llm_provider: "gemini".to_string(),
            llm_model: "gemini-1.5-flash".to_string(),
            llm_temperature: 0.1,
            llm_max_tokens: 4096,
            llm_timeout_secs: 45,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("meaningful_text_threshold", &self.meaningful_text_threshold)
            .field("force_ocr", &self.force_ocr)
            .field("ocr_api_key", &self.ocr_api_key.as_ref().map(|_| "<redacted>"))
            .field("ocr_endpoint", &self.ocr_endpoint)
            .field("ocr_max_payload_bytes", &self.ocr_max_payload_bytes)
            .field("ocr_reduced_quality", &self.ocr_reduced_quality)
            .field("ocr_page_delay_ms", &self.ocr_page_delay_ms)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("llm_provider", &self.llm_provider)
            .field("llm_model", &self.llm_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgress>"),
            )
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when an OCR key is present (blank keys count as absent).
    pub fn has_ocr_credential(&self) -> bool {
        self.ocr_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn meaningful_text_threshold(mut self, chars: usize) -> Self {
        self.config.meaningful_text_threshold = chars;
        self
    }

    pub fn force_ocr(mut self, v: bool) -> Self {
        self.config.force_ocr = v;
        self
    }

    pub fn ocr_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ocr_api_key = Some(key.into());
        self
    }

    pub fn ocr_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_endpoint = url.into();
        self
    }

    pub fn ocr_max_payload_bytes(mut self, bytes: usize) -> Self {
        self.config.ocr_max_payload_bytes = bytes;
        self
    }

    pub fn ocr_reduced_quality(mut self, quality: u8) -> Self {
        self.config.ocr_reduced_quality = quality.clamp(1, 100);
        self
    }

    pub fn ocr_page_delay_ms(mut self, ms: u64) -> Self {
        self.config.ocr_page_delay_ms = ms;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn llm_provider(mut self, name: impl Into<String>) -> Self {
        self.config.llm_provider = name.into();
        self
    }

    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = model.into();
        self
    }

    pub fn llm_temperature(mut self, t: f32) -> Self {
        self.config.llm_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn llm_max_tokens(mut self, n: usize) -> Self {
        self.config.llm_max_tokens = n;
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm_timeout_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(AnalyzerError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.ocr_max_payload_bytes == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "OCR payload limit must be > 0".into(),
            ));
        }
        if c.ocr_timeout_secs == 0 || c.llm_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if !(c.ocr_endpoint.starts_with("http://") || c.ocr_endpoint.starts_with("https://")) {
            return Err(AnalyzerError::InvalidConfig(format!(
                "OCR endpoint must be an HTTP(S) URL, got '{}'",
                c.ocr_endpoint
            )));
        }
        Ok(self.config)
    }
}

/// Which optional collaborators are usable for this process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// The user store opened and its schema is in place.
    pub database: bool,
    /// An OCR key is configured, so scanned notices can be read.
    pub ocr: bool,
    /// A summarisation provider was constructed.
    pub llm: bool,
}
