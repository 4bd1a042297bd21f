//! Render request handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use clipstamp_models::RenderRequest;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProcessResponse {
    pub job_id: String,
}

/// Accept a render request and return its job id immediately; rendering
/// proceeds asynchronously and is observed via the progress route.
pub async fn start_render(
    State(state): State<AppState>,
    Json(req): Json<RenderRequest>,
) -> ApiResult<Json<ProcessResponse>> {
    let job_id = state.render.submit(req).await?;
    Ok(Json(ProcessResponse { job_id }))
}
