use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::AppState;
use crate::ApiError;
use engine::{validate_workflow, Workflow};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_id: String,
    /// Case-insensitive match on name or id.
    pub q: Option<String>,
}

// GET /api/v1/workflows?userId=..&q=..
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Workflow>>, ApiError> {
    let search = query.q.as_deref().filter(|q| !q.trim().is_empty());
    let mut workflows = state.repo.list(&query.user_id, search).await?;
    for wf in &mut workflows {
        wf.status = wf.latest_status();
    }
    Ok(Json(workflows))
}

// GET /api/v1/workflows/:id
pub async fn get(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Workflow>, ApiError> {
    Ok(Json(state.repo.get(&id).await?))
}

// POST /api/v1/workflows
pub async fn create(
    State(state): State<AppState>,
    Json(mut workflow): Json<Workflow>,
) -> Result<(StatusCode, Json<Workflow>), ApiError> {
    validate_workflow(&workflow)?;

    // Ids come from the repository; a client-sent id must not hit an
    // existing workflow.
    workflow.id.clear();

    let id = state.repo.save(workflow).await?;
    info!(workflow_id = %id, "workflow created");
    Ok((StatusCode::CREATED, Json(state.repo.get(&id).await?)))
}

// PUT /api/v1/workflows/:id
pub async fn update(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(mut workflow): Json<Workflow>,
) -> Result<Json<Workflow>, ApiError> {
    state.repo.get(&id).await?;
    validate_workflow(&workflow)?;

    workflow.id = id;
    let id = state.repo.save(workflow).await?;
    Ok(Json(state.repo.get(&id).await?))
}

// DELETE /api/v1/workflows/:id
pub async fn delete(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.repo.delete(&id).await?;
    info!(workflow_id = %id, "workflow deleted");
    Ok(StatusCode::NO_CONTENT)
}
