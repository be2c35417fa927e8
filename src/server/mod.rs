//! HTTP surface: health probes, account registration and login, and notice
//! summarisation from a multipart upload.
//!
//! All shared state is built once at startup and handed to handlers through
//! [`AppState`]. Optional collaborators (the user store, the summariser) are
//! `None` when unavailable; the matching routes answer with an error instead
//! of failing at startup.

pub mod error;
pub mod handlers;

use crate::config::Capabilities;
use crate::extract::Extractor;
use crate::pipeline::llm::Summarizer;
use crate::store::UserStore;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

/// Upload cap for `/summarize`.
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub capabilities: Capabilities,
    pub store: Option<Arc<UserStore>>,
    pub extractor: Arc<Extractor>,
    pub summarizer: Option<Arc<dyn Summarizer>>,
}

impl AppState {
    /// Derive [`Capabilities`] from which collaborators are present.
    pub fn new(
        store: Option<Arc<UserStore>>,
        extractor: Arc<Extractor>,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Self {
        let capabilities = Capabilities {
            database: store.is_some(),
            ocr: extractor.config().has_ocr_credential(),
            llm: summarizer.is_some(),
        };
        Self {
            capabilities,
            store,
            extractor,
            summarizer,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/summarize", post(handlers::summarize))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let caps = state.capabilities;
    info!(
        addr = %listener.local_addr()?,
        database = caps.database,
        ocr = caps.ocr,
        llm = caps.llm,
        "Tax analyzer backend listening"
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!(error = %e, "Ctrl-C handler unavailable; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
