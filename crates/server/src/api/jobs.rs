//! Pipeline job API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use conductor_core::{JobFilter, JobState, PipelineJob, TriggerError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::handlers::{bad_request, ErrorResponse};
use crate::state::AppState;

/// Maximum allowed limit for job queries
const MAX_LIMIT: usize = 1000;

/// Default limit for job queries
const DEFAULT_LIMIT: usize = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for triggering a pipeline
#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    /// Subject key, e.g. a ticker symbol
    pub symbol: Option<String>,
}

/// Response for a triggered pipeline
#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: String,
    pub symbol: String,
    pub status: JobState,
    pub message: String,
}

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    /// Filter by state
    pub state: Option<String>,
    /// Filter by subject key
    pub symbol: Option<String>,
    /// Maximum number of jobs to return
    pub limit: Option<usize>,
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<PipelineJob>,
    pub total: usize,
}

/// Response for an unknown job id
#[derive(Debug, Serialize)]
pub struct JobNotFoundResponse {
    pub status: String,
    pub job_id: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Trigger a pipeline run. Returns as soon as the job is queued.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateJobBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateJobResponse>), (StatusCode, Json<ErrorResponse>)> {
    let Json(body) = body.map_err(|e| bad_request(e.body_text()))?;

    let symbol = body.symbol.unwrap_or_default();
    let job = state.trigger().trigger(&symbol).await.map_err(|e| {
        warn!(symbol = %symbol, "Rejected pipeline trigger: {}", e);
        match e {
            TriggerError::InvalidSubject(_) => bad_request(e.to_string()),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(other.to_string())),
            ),
        }
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateJobResponse {
            message: format!("Pipeline started for {}", job.subject),
            job_id: job.id,
            symbol: job.subject,
            status: job.state,
        }),
    ))
}

/// Get a job snapshot by ID
pub async fn get_job(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.trigger().status(&id).await {
        Some(job) => Json(job).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(JobNotFoundResponse {
                status: "not_found".to_string(),
                job_id: id,
            }),
        )
            .into_response(),
    }
}

/// List jobs with optional filters, newest first
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<ListJobsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let mut filter = JobFilter::new();

    if let Some(ref state_filter) = params.state {
        let job_state = state_filter
            .parse::<JobState>()
            .map_err(|e| bad_request(e.to_string()))?;
        filter = filter.with_state(job_state);
    }

    if let Some(ref symbol) = params.symbol {
        filter = filter.with_subject(symbol.trim());
    }

    let mut jobs = state.registry().list(&filter).await;
    let total = jobs.len();
    jobs.truncate(limit);

    Ok(Json(ListJobsResponse { jobs, total }))
}
