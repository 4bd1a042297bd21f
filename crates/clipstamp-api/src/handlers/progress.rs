//! Progress polling handler.

use axum::extract::{Path, State};
use axum::Json;

use clipstamp_models::JobSnapshot;

use crate::state::AppState;

/// Current snapshot for a job id.
///
/// An unknown id yields the `not_found` sentinel rather than an HTTP error,
/// distinguishing "never existed" from a job that exists and failed.
pub async fn job_progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Json<JobSnapshot> {
    let snapshot = state
        .registry
        .get(&job_id)
        .await
        .unwrap_or_else(JobSnapshot::not_found);
    Json(snapshot)
}
