//! Task API handlers: configured stages and single-task runs.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use conductor_core::{TaskResult, TriggerError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::handlers::{bad_request, ErrorResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for running one task
#[derive(Debug, Deserialize)]
pub struct RunTaskBody {
    pub symbol: Option<String>,
    /// Task name or script file; `script` is accepted for older clients
    #[serde(alias = "script")]
    pub task: Option<String>,
}

/// Response for a single task run
#[derive(Debug, Serialize)]
pub struct RunTaskResponse {
    pub symbol: String,
    pub task: String,
    /// "success" or "error"
    pub status: String,
    pub result: TaskResult,
}

#[derive(Debug, Serialize)]
pub struct TaskInfo {
    pub name: String,
    pub executable: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct StageInfo {
    pub name: String,
    pub tasks: Vec<TaskInfo>,
}

/// Response for listing configured stages
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub stages: Vec<StageInfo>,
    pub max_concurrency: usize,
    pub settle_interval_ms: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// List configured stages and their tasks
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<ListTasksResponse> {
    let controller = state.trigger().controller();

    let stages = controller
        .stages()
        .iter()
        .map(|stage| StageInfo {
            name: stage.name.clone(),
            tasks: stage
                .tasks
                .iter()
                .map(|task| TaskInfo {
                    name: task.name.clone(),
                    executable: task.program.clone(),
                    args: task.args.clone(),
                    timeout_secs: task.timeout.as_secs(),
                })
                .collect(),
        })
        .collect();

    Json(ListTasksResponse {
        stages,
        max_concurrency: controller.executor().max_concurrency(),
        settle_interval_ms: controller.settle_interval().as_millis() as u64,
    })
}

/// Run a single configured task and wait for its result
pub async fn run_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RunTaskBody>, JsonRejection>,
) -> Result<Json<RunTaskResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(body) = body.map_err(|e| bad_request(e.body_text()))?;

    let task_name = body
        .task
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| bad_request("task is required"))?;
    let symbol = body.symbol.unwrap_or_default();

    let result = state
        .trigger()
        .run_task(&task_name, &symbol)
        .await
        .map_err(|e| match e {
            TriggerError::UnknownTask { name, available } => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("unknown task '{}'", name),
                    available: Some(available),
                }),
            ),
            TriggerError::InvalidSubject(_) => bad_request(e.to_string()),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(other.to_string())),
            ),
        })?;

    let status = if result.success { "success" } else { "error" };

    Ok(Json(RunTaskResponse {
        symbol: symbol.trim().to_string(),
        task: result.task.clone(),
        status: status.to_string(),
        result,
    }))
}
