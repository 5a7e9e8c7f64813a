pub mod executions;
pub mod workflows;

use std::sync::Arc;

use axum::Json;
use serde_json::{json, Value};

use engine::{WorkflowExecutor, WorkflowRepository};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn WorkflowRepository>,
    pub executor: Arc<WorkflowExecutor>,
}

impl AppState {
    pub fn new(repo: Arc<dyn WorkflowRepository>, executor: WorkflowExecutor) -> Self {
        Self { repo, executor: Arc::new(executor) }
    }
}

// GET /api/v1/health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
