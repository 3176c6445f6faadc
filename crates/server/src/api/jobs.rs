//! Scheduled job API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use folio_core::{JobStatus, SchedulerStatus};

use super::ErrorResponse;
use crate::state::AppState;

/// GET /api/v1/jobs
///
/// Snapshot of every scheduled job.
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.scheduler().status().await)
}

/// GET /api/v1/jobs/{name}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<JobStatus>, impl IntoResponse> {
    match state.scheduler().job_status(&name).await {
        Some(status) => Ok(Json(status)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Job not found: {}", name),
            }),
        )),
    }
}
