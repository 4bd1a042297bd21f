//! Chunked upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    /// Target byte length after this chunk.
    pub size: u64,
}

/// Accept one upload chunk as multipart form data.
///
/// Fields: `filename` (target upload name), `index` (sequential chunk
/// index; 0 restarts the target), `chunk` (the bytes). The client submits
/// chunks in index order; the server appends in arrival order.
pub async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut filename: Option<String> = None;
    let mut index: Option<u64> = None;
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("filename") => {
                filename = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?,
                );
            }
            Some("index") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                index = Some(
                    text.parse()
                        .map_err(|_| ApiError::bad_request(format!("Invalid chunk index: {text}")))?,
                );
            }
            Some("chunk") => {
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let filename = filename.ok_or_else(|| ApiError::bad_request("Missing field: filename"))?;
    let index = index.ok_or_else(|| ApiError::bad_request("Missing field: index"))?;
    let bytes = bytes.ok_or_else(|| ApiError::bad_request("Missing field: chunk"))?;

    let size = state.store.append_chunk(&filename, index, &bytes).await?;

    debug!(filename = %filename, index, size, "Chunk accepted");

    Ok(Json(UploadResponse { ok: true, size }))
}
