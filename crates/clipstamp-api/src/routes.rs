//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{health, job_progress, start_render, stream_output, upload_chunk};
use crate::middleware::{cors_layer, isolation_headers, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload_chunk))
        .route("/process", post(start_render))
        .route("/progress/:id", get(job_progress))
        .route("/stream/:name", get(stream_output))
        .route("/health", get(health))
        // Both limits are needed: the extractor's built-in 2 MB default
        // would otherwise still apply to multipart reads.
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(isolation_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
