//! CLI binary: extract (and optionally summarise) one tax notice.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalyzerConfig` and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tax_notice_analyzer::pipeline::input::resolve_input;
use tax_notice_analyzer::{
    AnalyzerConfig, ExtractionProgress, Extractor, LlmSummarizer, ProgressCallback, Summarizer,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over the OCR loop. Pages arrive strictly in order, so one
/// start timestamp is enough.
struct CliProgress {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgress for CliProgress {
    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("OCR");
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.bar.println(bold(&format!(
            "Scanned notice: recognising {total_pages} pages…"
        )));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, chars: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{chars:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs();
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let mark = if success_count == 0 { red("✘") } else { green("✔") };
        eprintln!(
            "{} {}/{} pages recognised",
            mark,
            bold(&success_count.to_string()),
            total_pages
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the notice text (digital text layer or OCR)
  notice2text notice.pdf

  # Full JSON summary (needs GEMINI_API_KEY)
  notice2text --summarize notice.pdf

  # Scanned notice from a URL, extraction details as JSON
  OCR_SPACE_API_KEY=K8... notice2text --json https://example.com/cp14.pdf
"#;

#[derive(Parser, Debug)]
#[command(
    name = "notice2text",
    version,
    about = "Extract the text of an IRS tax-notice PDF (with OCR fallback) and optionally summarise it",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Print the extraction result (text, source, per-page outcomes) as JSON.
    #[arg(long, env = "NOTICE2TEXT_JSON")]
    json: bool,

    /// Send the extracted text to the LLM and print the JSON summary.
    #[arg(long)]
    summarize: bool,

    /// Skip the embedded text layer and always OCR.
    #[arg(long)]
    ocr_only: bool,

    /// Rasterisation DPI for scanned pages (72–400).
    #[arg(long, env = "NOTICE2TEXT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Pause between consecutive OCR calls, in milliseconds.
    #[arg(long, env = "NOTICE2TEXT_PAGE_DELAY_MS", default_value_t = 500)]
    page_delay_ms: u64,

    /// OCR.space API key.
    #[arg(long, env = "OCR_SPACE_API_KEY", hide_env_values = true)]
    ocr_api_key: Option<String>,

    /// OCR endpoint URL.
    #[arg(long, env = "OCR_SPACE_ENDPOINT")]
    ocr_endpoint: Option<String>,

    /// LLM provider for --summarize.
    #[arg(long, env = "NOTICE2TEXT_PROVIDER", default_value = "gemini")]
    provider: String,

    /// LLM model for --summarize.
    #[arg(long, env = "NOTICE2TEXT_MODEL", default_value = "gemini-1.5-flash")]
    model: String,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Timeout for downloading URL inputs, in seconds.
    #[arg(long, env = "NOTICE2TEXT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress bar.
    #[arg(long, env = "NOTICE2TEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Debug-level logging.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.summarize;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgress::new() as Arc<dyn ExtractionProgress>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;

    // ── Extract ──────────────────────────────────────────────────────────
    let document = resolve_input(&cli.input, cli.download_timeout)
        .await
        .context("Failed to load input")?;
    let extractor = Extractor::new(config.clone()).context("Failed to set up extractor")?;
    let result = extractor
        .extract(&document)
        .await
        .context("Could not read text from PDF")?;

    // ── Output ───────────────────────────────────────────────────────────
    if cli.summarize {
        let summarizer =
            LlmSummarizer::from_config(&config).context("Summariser is not configured")?;
        let summary = summarizer
            .summarize(&result.text)
            .await
            .context("Failed to get summary from AI")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    } else {
        let mut out = io::stdout().lock();
        out.write_all(result.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !result.text.ends_with('\n') {
            out.write_all(b"\n").context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "Extracted {} chars from {} text in {}ms",
            result.text.chars().count(),
            result.source.as_str(),
            result.stats.duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `AnalyzerConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .dpi(cli.dpi)
        .ocr_page_delay_ms(cli.page_delay_ms)
        .force_ocr(cli.ocr_only)
        .llm_provider(cli.provider.as_str())
        .llm_model(cli.model.as_str());

    if let Some(ref key) = cli.ocr_api_key {
        builder = builder.ocr_api_key(key.as_str());
    }
    if let Some(ref endpoint) = cli.ocr_endpoint {
        builder = builder.ocr_endpoint(endpoint.as_str());
    }
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
