use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::AppState;
use crate::ApiError;
use engine::Execution;

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub execution: Execution,
    /// Why the run failed, if it did.
    pub error: Option<String>,
    /// Whether the execution record reached the repository.
    pub saved: bool,
}

// POST /api/v1/workflows/:id/execute
//
// The run lives on its own task.  If the client goes away the handler future
// is dropped, the guard fires and the run is cancelled.
pub async fn execute(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let AppState { repo, executor } = state;
    let run = tokio::spawn(async move { executor.run_stored(repo.as_ref(), &id, cancel).await })
        .await
        .map_err(|e| ApiError::Internal(format!("execution task failed: {e}")))??;

    if let Err(e) = &run.saved {
        warn!(execution_id = %run.result.execution.id, "execution not recorded: {}", e);
    }

    Ok(Json(ExecuteResponse {
        error: run.result.error.as_ref().map(ToString::to_string),
        saved: run.saved.is_ok(),
        execution: run.result.execution,
    }))
}

// GET /api/v1/workflows/:id/executions
pub async fn list(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Execution>>, ApiError> {
    let workflow = state.repo.get(&id).await?;
    Ok(Json(workflow.executions))
}
