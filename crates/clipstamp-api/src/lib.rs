//! Axum HTTP API server.
//!
//! This crate provides:
//! - Chunked upload, render, progress-poll, and artifact-streaming routes
//! - The in-memory job registry
//! - The render supervisor driving the transcoding engine

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use registry::JobRegistry;
pub use routes::create_router;
pub use services::RenderService;
pub use state::AppState;
