//! Run a stored workflow and record the result.

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::executor::{ExecutionResult, WorkflowExecutor};
use crate::repository::{RepositoryError, WorkflowRepository};
use crate::EngineError;

/// Outcome of [`WorkflowExecutor::run_stored`].
///
/// `result` says whether the workflow succeeded; `saved` says whether its
/// execution record reached the repository.  A failed save does not change
/// the run's outcome and is not retried.
#[derive(Debug)]
pub struct TriggeredRun {
    pub result: ExecutionResult,
    pub saved: Result<(), RepositoryError>,
}

impl WorkflowExecutor {
    /// Load `workflow_id`, run it, and append the sealed execution to its
    /// history.
    ///
    /// # Errors
    /// `EngineError::Persistence` if the workflow cannot be loaded and
    /// `EngineError::Validation` if it is malformed.  Both happen before
    /// anything runs or is written.
    #[instrument(skip(self, repo, cancel))]
    pub async fn run_stored(
        &self,
        repo: &dyn WorkflowRepository,
        workflow_id: &str,
        cancel: CancellationToken,
    ) -> Result<TriggeredRun, EngineError> {
        let workflow = repo.get(workflow_id).await?;
        let result = self.run(&workflow, cancel).await?;

        let saved = repo.append_execution(workflow_id, &result.execution).await;
        match &saved {
            Ok(()) => info!(execution_id = %result.execution.id, "execution recorded"),
            Err(e) => error!(execution_id = %result.execution.id, "failed to record execution: {}", e),
        }

        Ok(TriggeredRun { result, saved })
    }
}
