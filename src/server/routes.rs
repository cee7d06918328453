//! HTTP route handlers for the query API.

use crate::error::SearchError;
use crate::metrics::MetricsSnapshot;
use crate::query::{Hit, QueryEngine};
use crate::server::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

// --- Request/Response types ---

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<Hit>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub documents: usize,
    pub dimension: usize,
    pub model: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// --- Router ---

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", post(search))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

// --- Handlers ---

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let k = req.k.unwrap_or(state.default_k);
    let query = req.query;
    let start = Instant::now();

    // Embedders may block on network I/O.
    let worker = Arc::clone(&state);
    let text = query.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        QueryEngine::new(&worker.store, worker.embedder.as_ref())
            .with_preview_chars(worker.preview_chars)
            .answer(&text, k)
    })
    .await
    .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match outcome {
        Ok(results) => {
            if let Ok(mut metrics) = state.metrics.write() {
                metrics.record_query(start.elapsed(), results.len());
            }
            Ok(Json(SearchResponse { query, results }))
        }
        Err(e) => {
            if let Ok(mut metrics) = state.metrics.write() {
                metrics.record_failure();
            }
            log::debug!("Search failed: {}", e);
            Err(error(status_for(&e), e.to_string()))
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        documents: state.store.len(),
        dimension: state.store.dimension(),
        model: state.embedder.model_id().to_string(),
    })
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Result<Json<MetricsSnapshot>, ApiError> {
    let metrics = state
        .metrics
        .read()
        .map_err(|_| error(StatusCode::INTERNAL_SERVER_ERROR, "Lock poisoned".to_string()))?;
    Ok(Json(metrics.snapshot()))
}

fn status_for(err: &SearchError) -> StatusCode {
    match err {
        SearchError::EmptyQuery
        | SearchError::InvalidArgument(_)
        | SearchError::DimensionMismatch { .. }
        | SearchError::DegenerateVector { .. } => StatusCode::BAD_REQUEST,
        SearchError::Embedding(_) | SearchError::EmbeddingCount { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorResponse { error: message }))
}
