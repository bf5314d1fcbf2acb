//! HTTP application wiring (Axum router + shared state).
//!
//! - `routes.rs`: handlers for `/`, `/health` and `/analyze`
//! - `errors.rs`: consistent JSON error responses

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use shelfscan_core::Analyzer;
use tower_http::cors::CorsLayer;

pub mod errors;
pub mod routes;

/// State shared by every request. Built once at startup, never mutated.
pub struct AppState {
    pub analyzer: Analyzer,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Derive the request-handling settings from the analyzer's config.
    pub fn new(analyzer: Analyzer) -> Self {
        let config = analyzer.config();
        let upload_dir = config.upload_dir();
        let max_upload_bytes = usize::try_from(config.server.max_upload_mb)
            .unwrap_or(usize::MAX)
            .saturating_mul(1024 * 1024);
        Self {
            analyzer,
            upload_dir,
            max_upload_bytes,
        }
    }
}

/// Build the full HTTP router.
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/analyze", post(routes::analyze))
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}
