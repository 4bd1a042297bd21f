//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use clipstamp_media::MediaError;
use clipstamp_models::RequestError;
use clipstamp_storage::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid render request: {0}")]
    Request(#[from] RequestError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Request(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::Storage(StorageError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Storage(StorageError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            ApiError::Storage(StorageError::InvalidRange(_)) => {
                StatusCode::RANGE_NOT_SATISFIABLE
            }
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Media(_)
            | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let detail = match &self {
            // Don't leak filesystem/process details on server-side failures
            ApiError::Internal(_) | ApiError::Media(_) | ApiError::Io(_) => {
                "An internal error occurred".to_string()
            }
            ApiError::Storage(e) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %e, "Storage failure");
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
