//! Output artifact streaming with range support.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

/// Stream a finished output artifact.
///
/// Honors single `Range` requests with 206 responses so clients can seek
/// during playback; plain requests get the whole artifact with
/// `Accept-Ranges` advertised.
pub async fn stream_output(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let range_header = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let (bytes, total_size, range) = state
        .store
        .read_output_range(&name, range_header.as_deref())
        .await?;

    let content_type = if name.to_lowercase().ends_with(".mp4") {
        "video/mp4"
    } else {
        "application/octet-stream"
    };

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, bytes.len());

    builder = match range {
        Some(range) => builder.status(StatusCode::PARTIAL_CONTENT).header(
            header::CONTENT_RANGE,
            format!("bytes {range}/{total_size}"),
        ),
        None => builder.status(StatusCode::OK),
    };

    builder
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {e}")))
}
