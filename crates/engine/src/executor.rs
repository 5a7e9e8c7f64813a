//! Workflow execution engine.
//!
//! `WorkflowExecutor` is the central orchestrator:
//! 1. Validates the graph; an invalid workflow never starts.
//! 2. Opens a fresh [`Journal`] and logs the `start` entry.
//! 3. Walks nodes in the configured [`TraversalMode`], dispatching each to
//!    the executor for its kind.
//! 4. Stops at the first failure (fail-fast, no retries) or on cancellation.
//! 5. Seals the journal into an [`Execution`].
//!
//! The executor holds no per-run state, so one instance can serve any number
//! of concurrent runs.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use nodes::http::HttpError;
use nodes::journal::{CANCELLED_MARKER, COMPLETE_MARKER, ERROR_MARKER, START_MARKER};
use nodes::{
    ApiNode, DecisionNode, ExecutableNode, ExecutionContext, FlowNode, Journal, LogStatus,
    NodeError, NodeKind, ReqwestHttpClient, TaskNode,
};

use crate::dag::validate_workflow;
use crate::models::{Execution, ExecutionStatus, Workflow};
use crate::traversal::{Traversal, TraversalMode};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Order in which nodes are visited.
    pub traversal: TraversalMode,
    /// Upper bound on a single API node call, in seconds.  Zero counts as one.
    pub api_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            traversal: TraversalMode::Declaration,
            api_timeout_secs: nodes::api::DEFAULT_API_TIMEOUT.as_secs(),
        }
    }
}

impl ExecutorConfig {
    /// The API call bound; never shorter than one second.
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs.max(1))
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

// ---------------------------------------------------------------------------
// Node executors
// ---------------------------------------------------------------------------

/// One executor per node kind.
#[derive(Clone)]
pub struct NodeExecutors {
    pub task: Arc<dyn ExecutableNode>,
    pub api: Arc<dyn ExecutableNode>,
    pub decision: Arc<dyn ExecutableNode>,
}

impl NodeExecutors {
    /// The built-in executors: a real HTTP client bounded by the configured
    /// timeout and the random condition evaluator.
    pub fn standard(config: &ExecutorConfig) -> Result<Self, HttpError> {
        let client = Arc::new(ReqwestHttpClient::new(config.api_timeout())?);
        Ok(Self {
            task: Arc::new(TaskNode),
            api: Arc::new(ApiNode::new(client, config.api_timeout())),
            decision: Arc::new(DecisionNode::default()),
        })
    }

    pub fn for_node(&self, node: &FlowNode) -> &dyn ExecutableNode {
        match node.kind {
            NodeKind::Task(_) => self.task.as_ref(),
            NodeKind::Api(_) => self.api.as_ref(),
            NodeKind::Decision(_) => self.decision.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output of a completed execution
// ---------------------------------------------------------------------------

/// The result of running a full workflow.
///
/// A run that started always yields a sealed [`Execution`]; `error` says why
/// it failed, if it did.
#[derive(Debug)]
pub struct ExecutionResult {
    pub execution: Execution,
    pub error: Option<EngineError>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Split into a plain `Result`; the sealed execution travels on both
    /// sides.
    pub fn into_result(self) -> Result<Execution, (Execution, EngineError)> {
        match self.error {
            None => Ok(self.execution),
            Some(err) => Err((self.execution, err)),
        }
    }
}

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Pending,
    Running,
    Success,
    Failed,
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Stateless orchestrator that runs workflow executions.
pub struct WorkflowExecutor {
    executors: NodeExecutors,
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    /// Create a new executor.
    pub fn new(executors: NodeExecutors, config: ExecutorConfig) -> Self {
        Self { executors, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run the workflow once.
    ///
    /// # Errors
    /// Returns `EngineError::Validation` if the graph is malformed; nothing
    /// is executed in that case.  Node failures and cancellation do not
    /// produce `Err`; they are reported through [`ExecutionResult::error`]
    /// alongside the sealed, failed execution.
    #[instrument(skip(self, workflow, cancel), fields(workflow_id = %workflow.id))]
    pub async fn run(
        &self,
        workflow: &Workflow,
        cancel: CancellationToken,
    ) -> Result<ExecutionResult, EngineError> {
        validate_workflow(workflow)?;

        let mut journal = Journal::open();
        let ctx = ExecutionContext {
            workflow_id: workflow.id.clone(),
            execution_id: journal.execution_id(),
        };
        let mut state = RunState::Pending;
        journal.append(START_MARKER, LogStatus::Success, "Workflow execution started");
        info!(
            execution_id = %ctx.execution_id,
            nodes = workflow.nodes.len(),
            traversal = ?self.config.traversal,
            "Workflow execution started"
        );

        if cancel.is_cancelled() {
            return Ok(cancelled(journal, state, None));
        }

        advance(&mut state, RunState::Running);
        let mut traversal = Traversal::new(workflow, self.config.traversal);

        while let Some(node) = traversal.next_node() {
            if cancel.is_cancelled() {
                return Ok(cancelled(journal, state, None));
            }

            journal.append(&node.id, LogStatus::Pending, format!("Executing node: {}", node.label()));
            let executor = self.executors.for_node(node);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(NodeError::Cancelled),
                res = executor.execute(node, &mut journal, &ctx) => res,
            };

            match result {
                Ok(outcome) => {
                    debug!(node_id = %node.id, ?outcome, "node finished");
                    traversal.complete(node, outcome);
                }
                Err(NodeError::Cancelled) => return Ok(cancelled(journal, state, Some(node))),
                Err(err) => {
                    error!(node_id = %node.id, "node failed: {}", err);
                    journal.append(
                        &node.id,
                        LogStatus::Failed,
                        format!("Error executing node {}: {}", node.label(), err),
                    );
                    journal.append(
                        ERROR_MARKER,
                        LogStatus::Failed,
                        format!("Workflow execution failed: {err}"),
                    );
                    advance(&mut state, RunState::Failed);

                    return Ok(ExecutionResult {
                        execution: journal.seal(ExecutionStatus::Failed),
                        error: Some(EngineError::NodeExecution {
                            node_id: node.id.clone(),
                            source: err,
                        }),
                    });
                }
            }
        }

        let skipped = traversal.skipped();
        if !skipped.is_empty() {
            info!(?skipped, "nodes not reached by traversal");
        }

        journal.append(
            COMPLETE_MARKER,
            LogStatus::Success,
            "Workflow execution completed successfully",
        );
        advance(&mut state, RunState::Success);
        info!(execution_id = %ctx.execution_id, "Workflow execution succeeded");

        Ok(ExecutionResult {
            execution: journal.seal(ExecutionStatus::Success),
            error: None,
        })
    }
}

fn advance(state: &mut RunState, to: RunState) {
    debug!(from = ?state, to = ?to, "run state");
    *state = to;
}

/// Close out a cancelled run.  `node` is the node that was in flight, if any.
fn cancelled(mut journal: Journal, mut state: RunState, node: Option<&FlowNode>) -> ExecutionResult {
    warn!(execution_id = %journal.execution_id(), "Workflow execution cancelled");

    if let Some(node) = node {
        journal.append(
            &node.id,
            LogStatus::Failed,
            format!("Error executing node {}: {}", node.label(), NodeError::Cancelled),
        );
    }
    journal.append(CANCELLED_MARKER, LogStatus::Failed, "Workflow execution cancelled");
    advance(&mut state, RunState::Failed);

    ExecutionResult {
        execution: journal.seal(ExecutionStatus::Failed),
        error: Some(EngineError::Cancelled),
    }
}
