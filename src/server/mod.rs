//! HTTP query API over a loaded index.

pub mod routes;

use crate::embedder::Embedder;
use crate::metrics::QueryMetrics;
use crate::storage::VectorStore;
use std::sync::{Arc, RwLock};

/// Shared application state for the HTTP server.
pub struct AppState {
    pub store: Arc<VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub metrics: RwLock<QueryMetrics>,
    pub default_k: usize,
    pub preview_chars: usize,
}

impl AppState {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            metrics: RwLock::new(QueryMetrics::new()),
            default_k: crate::config::DEFAULT_TOP_K,
            preview_chars: crate::config::DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_query_defaults(mut self, default_k: usize, preview_chars: usize) -> Self {
        self.default_k = default_k;
        self.preview_chars = preview_chars;
        self
    }
}

/// Serve the query API on `addr` until the process is stopped.
pub async fn start(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
