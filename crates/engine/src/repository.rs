//! Workflow repository — the engine's only view of storage.
//!
//! Identity and timestamps of the stored document are the repository's
//! business: `save` assigns ids and stamps `lastEditedOn`.  The execution
//! history is append-only; `save` never changes it.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use db::DbPool;

use crate::models::{Execution, Workflow};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("workflow '{0}' not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error("workflow document could not be (de)serialised: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage gateway for workflows and their execution history.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Workflow, RepositoryError>;

    /// Insert or replace a workflow and return its id.
    async fn save(&self, workflow: Workflow) -> Result<String, RepositoryError>;

    /// Append a sealed execution to the workflow's history.
    async fn append_execution(&self, id: &str, execution: &Execution) -> Result<(), RepositoryError>;

    /// A user's workflows, newest first, optionally filtered by a search
    /// term matched against name or id.
    async fn list(&self, user_id: &str, search: Option<&str>) -> Result<Vec<Workflow>, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}

/// Assign an id to a never-saved workflow and stamp the edit time.
fn prepare_for_save(workflow: &mut Workflow) {
    if workflow.id.is_empty() {
        workflow.id = Uuid::now_v7().to_string();
    }
    workflow.last_edited_on = Some(Utc::now());
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local repository.  Insertion order is kept so `list` can return
/// newest first.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    workflows: RwLock<Vec<Workflow>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryRepository {
    async fn get(&self, id: &str) -> Result<Workflow, RepositoryError> {
        self.workflows
            .read()
            .await
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_owned()))
    }

    async fn save(&self, mut workflow: Workflow) -> Result<String, RepositoryError> {
        prepare_for_save(&mut workflow);
        let id = workflow.id.clone();

        let mut workflows = self.workflows.write().await;
        match workflows.iter_mut().find(|w| w.id == id) {
            Some(existing) => {
                workflow.executions = std::mem::take(&mut existing.executions);
                *existing = workflow;
            }
            None => {
                workflow.executions.clear();
                workflows.push(workflow);
            }
        }

        debug!(workflow_id = %id, "workflow saved");
        Ok(id)
    }

    async fn append_execution(&self, id: &str, execution: &Execution) -> Result<(), RepositoryError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_owned()))?;
        workflow.executions.push(execution.clone());
        Ok(())
    }

    async fn list(&self, user_id: &str, search: Option<&str>) -> Result<Vec<Workflow>, RepositoryError> {
        Ok(self
            .workflows
            .read()
            .await
            .iter()
            .rev()
            .filter(|w| w.user_id == user_id)
            .filter(|w| search.map_or(true, |term| w.matches_search(term)))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let mut workflows = self.workflows.write().await;
        let before = workflows.len();
        workflows.retain(|w| w.id != id);
        if workflows.len() == before {
            return Err(RepositoryError::NotFound(id.to_owned()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Repository backed by the `workflows` document table of the `db` crate.
#[derive(Debug, Clone)]
pub struct PgWorkflowRepository {
    pool: DbPool,
}

impl PgWorkflowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn not_found(id: &str) -> impl FnOnce(db::DbError) -> RepositoryError + '_ {
    move |err| match err {
        db::DbError::NotFound => RepositoryError::NotFound(id.to_owned()),
        other => RepositoryError::Database(other),
    }
}

fn from_row(row: db::models::WorkflowRow) -> Result<Workflow, RepositoryError> {
    let mut workflow: Workflow = serde_json::from_value(row.document)?;
    workflow.id = row.id;
    Ok(workflow)
}

#[async_trait]
impl WorkflowRepository for PgWorkflowRepository {
    async fn get(&self, id: &str) -> Result<Workflow, RepositoryError> {
        let row = db::repository::workflows::get_workflow(&self.pool, id)
            .await
            .map_err(not_found(id))?;
        from_row(row)
    }

    async fn save(&self, mut workflow: Workflow) -> Result<String, RepositoryError> {
        prepare_for_save(&mut workflow);
        // The stored history wins over whatever the caller sent.
        workflow.executions.clear();
        let document = serde_json::to_value(&workflow)?;

        db::repository::workflows::upsert_workflow(&self.pool, &workflow.id, &workflow.user_id, document)
            .await?;
        debug!(workflow_id = %workflow.id, "workflow saved");
        Ok(workflow.id)
    }

    async fn append_execution(&self, id: &str, execution: &Execution) -> Result<(), RepositoryError> {
        let value = serde_json::to_value(execution)?;
        db::repository::executions::append_execution(&self.pool, id, value)
            .await
            .map_err(not_found(id))
    }

    async fn list(&self, user_id: &str, search: Option<&str>) -> Result<Vec<Workflow>, RepositoryError> {
        db::repository::workflows::list_workflows(&self.pool, user_id, search)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        db::repository::workflows::delete_workflow(&self.pool, id)
            .await
            .map_err(not_found(id))
    }
}
