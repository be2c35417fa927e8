//! HTTP server binary for the tax-notice analyzer.
//!
//! Optional collaborators are probed once here: a missing `DATABASE_URL` or
//! an unopenable database turns the account routes off, a missing LLM key
//! turns summaries off. The server starts either way.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tax_notice_analyzer::server::{self, AppState};
use tax_notice_analyzer::{AnalyzerConfig, Extractor, LlmSummarizer, Summarizer, UserStore};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tax-notice-server",
    version,
    about = "HTTP backend that reads and summarises IRS tax-notice PDFs",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Address to bind.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind: std::net::IpAddr,

    /// SQLite database for user accounts (`sqlite://path`, a path, or `:memory:`).
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// OCR.space API key; without it scanned notices cannot be read.
    #[arg(long, env = "OCR_SPACE_API_KEY", hide_env_values = true)]
    ocr_api_key: Option<String>,

    /// OCR endpoint URL.
    #[arg(long, env = "OCR_SPACE_ENDPOINT")]
    ocr_endpoint: Option<String>,

    /// LLM provider for summaries (reads its key, e.g. GEMINI_API_KEY, from the env).
    #[arg(long, env = "LLM_PROVIDER", default_value = "gemini")]
    provider: String,

    /// LLM model for summaries.
    #[arg(long, env = "LLM_MODEL", default_value = "gemini-1.5-flash")]
    model: String,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

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

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(match (cli.verbose, cli.quiet) {
                (true, _) => "debug",
                (_, true) => "error",
                _ => "info",
            })
        }))
        .with_writer(std::io::stderr)
        .init();

    info!("Initializing Tax Analyzer Backend...");

    let config = build_config(&cli)?;
    if !config.has_ocr_credential() {
        warn!("OCR_SPACE_API_KEY not set; scanned notices will fail to read");
    }

    let store = open_store(cli.database_url.as_deref()).await;

    let summarizer: Option<Arc<dyn Summarizer>> = match LlmSummarizer::from_config(&config) {
        Ok(s) => Some(Arc::new(s)),
        Err(e) => {
            warn!(error = %e, "Summariser unavailable; /summarize will fail");
            None
        }
    };

    let extractor = Arc::new(Extractor::new(config).context("Failed to set up extractor")?);
    let state = AppState::new(store, extractor, summarizer);

    let addr = SocketAddr::new(cli.bind, cli.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    server::serve(listener, state).await.context("Server error")
}

fn build_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
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
    builder.build().context("Invalid configuration")
}

/// `None` (database capability off) when unset or unopenable.
async fn open_store(url: Option<&str>) -> Option<Arc<UserStore>> {
    let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
        warn!("DATABASE_URL not set; database features will be disabled");
        return None;
    };
    let url = url.to_string();
    match tokio::task::spawn_blocking(move || UserStore::open(&url)).await {
        Ok(Ok(store)) => Some(Arc::new(store)),
        Ok(Err(e)) => {
            warn!(error = %e, "Could not open database; database features will be disabled");
            None
        }
        Err(e) => {
            warn!(error = %e, "Database setup task failed; database features will be disabled");
            None
        }
    }
}
