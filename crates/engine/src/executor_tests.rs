//! End-to-end tests for the workflow execution engine.
//!
//! Node executors are wired to `nodes::mock` doubles so no network access is
//! needed, except for one test that dials a refused loopback port.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use nodes::journal::{CANCELLED_MARKER, COMPLETE_MARKER, ERROR_MARKER, START_MARKER};
use nodes::mock::{FixedEvaluator, MockHttpClient, MockNode};
use nodes::{ApiNode, DecisionNode, NodeError, TaskNode};

use crate::models::{Edge, Execution, ExecutionStatus, FlowNode, LogStatus, Workflow};
use crate::repository::{InMemoryRepository, RepositoryError, WorkflowRepository};
use crate::{EngineError, ExecutorConfig, NodeExecutors, TraversalMode, ValidationError, WorkflowExecutor};

const OK_URL: &str = "https://api.example.test/items";

fn executors(http: MockHttpClient, branch: bool) -> NodeExecutors {
    NodeExecutors {
        task: Arc::new(TaskNode),
        api: Arc::new(ApiNode::new(Arc::new(http), Duration::from_secs(5))),
        decision: Arc::new(DecisionNode::new(Arc::new(FixedEvaluator(branch)))),
    }
}

fn engine() -> WorkflowExecutor {
    let http = MockHttpClient::new().with_json(OK_URL, 200, json!({ "a": 1, "b": 2 }));
    WorkflowExecutor::new(executors(http, true), ExecutorConfig::default())
}

fn graph_engine(branch: bool) -> WorkflowExecutor {
    let config = ExecutorConfig { traversal: TraversalMode::Graph, ..ExecutorConfig::default() };
    WorkflowExecutor::new(executors(MockHttpClient::new(), branch), config)
}

fn workflow(nodes: Vec<FlowNode>, edges: Vec<Edge>) -> Workflow {
    let mut wf = Workflow::new("test", "user-1", nodes, edges);
    wf.id = "wf-test".into();
    wf
}

/// `(id, status)` pairs of an execution log.
fn trail(execution: &Execution) -> Vec<(String, LogStatus)> {
    execution.logs.iter().map(|e| (e.node_id.clone(), e.status)).collect()
}

fn ids(execution: &Execution) -> Vec<&str> {
    execution.logs.iter().map(|e| e.node_id.as_str()).collect()
}

/// Mock executors for every kind, sharing call counters with the test.
struct Recorders {
    task: Arc<MockNode>,
    api: Arc<MockNode>,
    decision: Arc<MockNode>,
}

impl Recorders {
    fn new(task: MockNode, api: MockNode, decision: MockNode) -> Self {
        Self { task: Arc::new(task), api: Arc::new(api), decision: Arc::new(decision) }
    }

    fn executors(&self) -> NodeExecutors {
        NodeExecutors {
            task: self.task.clone(),
            api: self.api.clone(),
            decision: self.decision.clone(),
        }
    }

    fn total_calls(&self) -> usize {
        self.task.call_count() + self.api.call_count() + self.decision.call_count()
    }
}

// ============================================================
// Happy path
// ============================================================

#[tokio::test]
async fn single_task_produces_four_entries() {
    let wf = workflow(vec![FlowNode::task("A", "A")], vec![]);

    let result = engine().run(&wf, CancellationToken::new()).await.expect("valid workflow");

    assert!(result.is_success());
    assert_eq!(result.execution.status, ExecutionStatus::Success);
    assert_eq!(
        trail(&result.execution),
        vec![
            (START_MARKER.to_string(), LogStatus::Success),
            ("A".to_string(), LogStatus::Pending),
            ("A".to_string(), LogStatus::Success),
            (COMPLETE_MARKER.to_string(), LogStatus::Success),
        ]
    );
    assert_eq!(result.execution.logs[2].message, "Task \"A\" executed successfully");
}

#[tokio::test]
async fn empty_workflow_logs_only_start_and_complete() {
    let result = engine().run(&workflow(vec![], vec![]), CancellationToken::new()).await.unwrap();

    assert!(result.is_success());
    assert_eq!(ids(&result.execution), vec![START_MARKER, COMPLETE_MARKER]);
}

#[tokio::test]
async fn log_starts_with_start_and_never_goes_back_in_time() {
    let wf = workflow(
        vec![
            FlowNode::task("t", "Prepare"),
            FlowNode::api("api", "Fetch", OK_URL),
            FlowNode::decision("d", "Check", "condition === true"),
            FlowNode::task("t2", "Finish"),
        ],
        vec![],
    );

    let result = engine().run(&wf, CancellationToken::new()).await.unwrap();
    let logs = &result.execution.logs;

    assert!(result.is_success());
    assert_eq!(logs[0].node_id, START_MARKER);
    assert!(logs.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(result.execution.timestamp <= logs[0].timestamp);
    assert!(logs
        .iter()
        .any(|e| e.message == "API call successful. Received 2 items."));
}

#[tokio::test]
async fn decision_node_evaluates_once_and_succeeds_either_way() {
    let wf = workflow(vec![FlowNode::decision("d", "Coin", "condition === true")], vec![]);

    for branch in [true, false] {
        let http = MockHttpClient::new();
        let executor = WorkflowExecutor::new(executors(http, branch), ExecutorConfig::default());
        let result = executor.run(&wf, CancellationToken::new()).await.unwrap();

        assert!(result.is_success());
        let evaluations: Vec<_> = result
            .execution
            .logs
            .iter()
            .filter(|e| e.message.starts_with("Condition evaluated to"))
            .collect();
        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations[0].message, format!("Condition evaluated to {branch}"));
    }
}

#[tokio::test]
async fn random_decision_with_standard_executors_succeeds() {
    let wf = workflow(vec![FlowNode::decision("d", "Coin", "anything")], vec![]);
    let config = ExecutorConfig::default();
    let executor = WorkflowExecutor::new(NodeExecutors::standard(&config).unwrap(), config);

    for _ in 0..10 {
        let result = executor.run(&wf, CancellationToken::new()).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.execution.logs.len(), 5);
    }
}

#[tokio::test]
async fn reruns_get_distinct_ids_and_independent_logs() {
    let wf = workflow(vec![FlowNode::task("A", "A")], vec![]);
    let executor = engine();

    let first = executor.run(&wf, CancellationToken::new()).await.unwrap().execution;
    let second = executor.run(&wf, CancellationToken::new()).await.unwrap().execution;

    assert_ne!(first.id, second.id);
    assert_eq!(first.logs.len(), 4);
    assert_eq!(second.logs.len(), 4);
}

#[tokio::test]
async fn concurrent_runs_share_nothing() {
    let wf = Arc::new(workflow(
        vec![FlowNode::task("A", "A"), FlowNode::api("api", "Fetch", OK_URL)],
        vec![],
    ));
    let executor = Arc::new(engine());

    let runs: Vec<_> = (0..4)
        .map(|_| {
            let (wf, executor) = (wf.clone(), executor.clone());
            tokio::spawn(async move { executor.run(&wf, CancellationToken::new()).await })
        })
        .collect();

    let mut seen = std::collections::HashSet::new();
    for run in runs {
        let result = run.await.unwrap().unwrap();
        assert!(result.is_success());
        assert_eq!(result.execution.logs.len(), 7);
        assert!(seen.insert(result.execution.id));
    }
}

#[tokio::test]
async fn into_result_splits_success_and_failure() {
    let ok = engine()
        .run(&workflow(vec![FlowNode::task("A", "A")], vec![]), CancellationToken::new())
        .await
        .unwrap();
    let execution = ok.into_result().expect("run succeeded");
    assert_eq!(execution.status, ExecutionStatus::Success);

    let failed = engine()
        .run(
            &workflow(vec![FlowNode::api("api", "Down", "http://down.invalid/")], vec![]),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let (execution, err) = failed.into_result().unwrap_err();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(matches!(err, EngineError::NodeExecution { ref node_id, .. } if node_id == "api"));
}

#[test]
fn zero_api_timeout_is_raised_to_one_second() {
    let config = ExecutorConfig::from_toml("api_timeout_secs = 0").unwrap();
    assert_eq!(config.api_timeout(), Duration::from_secs(1));
    assert_eq!(ExecutorConfig::default().api_timeout(), Duration::from_secs(30));
}

// ============================================================
// Failure handling
// ============================================================

#[tokio::test]
async fn unreachable_api_fails_fast() {
    let wf = workflow(
        vec![
            FlowNode::task("before", "Before"),
            FlowNode::api("api", "Fetch", "http://unreachable.invalid/"),
            FlowNode::task("after", "After"),
        ],
        vec![],
    );

    let result = engine().run(&wf, CancellationToken::new()).await.unwrap();

    assert_eq!(result.execution.status, ExecutionStatus::Failed);
    assert!(matches!(
        result.error,
        Some(EngineError::NodeExecution { ref node_id, source: NodeError::Transport(_) }) if node_id == "api"
    ));

    let last = result.execution.logs.last().unwrap();
    assert_eq!(last.node_id, ERROR_MARKER);
    assert_eq!(last.status, LogStatus::Failed);
    assert!(last.message.starts_with("Workflow execution failed:"), "{}", last.message);
    assert!(last.message.contains("connection refused"), "{}", last.message);

    assert!(!ids(&result.execution).contains(&"after"));
    assert_eq!(
        ids(&result.execution),
        vec![START_MARKER, "before", "before", "api", "api", "api", "api", ERROR_MARKER]
    );
}

#[tokio::test]
async fn refused_connection_fails_with_real_client() {
    let wf = workflow(vec![FlowNode::api("api", "Local", "http://127.0.0.1:1/")], vec![]);
    let config = ExecutorConfig { api_timeout_secs: 5, ..ExecutorConfig::default() };
    let executor = WorkflowExecutor::new(NodeExecutors::standard(&config).unwrap(), config);

    let result = executor.run(&wf, CancellationToken::new()).await.unwrap();

    assert_eq!(result.execution.status, ExecutionStatus::Failed);
    assert_eq!(result.execution.logs.last().unwrap().node_id, ERROR_MARKER);
}

#[tokio::test]
async fn api_error_status_is_reported() {
    let http = MockHttpClient::new().with_json(OK_URL, 500, json!({}));
    let executor = WorkflowExecutor::new(executors(http, true), ExecutorConfig::default());
    let wf = workflow(vec![FlowNode::api("api", "Fetch", OK_URL)], vec![]);

    let result = executor.run(&wf, CancellationToken::new()).await.unwrap();

    let messages: Vec<_> = result.execution.logs.iter().map(|e| e.message.as_str()).collect();
    assert!(messages.contains(&"API call failed: API responded with status: 500"));
    assert!(messages.contains(&"Error executing node Fetch: API responded with status: 500"));
    assert_eq!(
        messages.last().copied(),
        Some("Workflow execution failed: API responded with status: 500")
    );
}

#[tokio::test]
async fn failing_node_stops_later_nodes() {
    let recorders = Recorders::new(
        MockNode::succeeding(),
        MockNode::failing(NodeError::Status(502)),
        MockNode::succeeding(),
    );
    let executor = WorkflowExecutor::new(recorders.executors(), ExecutorConfig::default());
    let wf = workflow(
        vec![
            FlowNode::task("ok", "Ok"),
            FlowNode::api("boom", "Boom", OK_URL),
            FlowNode::task("never", "Never"),
            FlowNode::decision("never2", "Never", "true"),
        ],
        vec![],
    );

    let result = executor.run(&wf, CancellationToken::new()).await.unwrap();

    assert!(!result.is_success());
    assert_eq!(recorders.task.calls(), vec!["ok"]);
    assert_eq!(recorders.api.calls(), vec!["boom"]);
    assert_eq!(recorders.decision.call_count(), 0);
}

// ============================================================
// Validation
// ============================================================

#[tokio::test]
async fn dangling_edge_is_rejected_before_any_node_runs() {
    let recorders = Recorders::new(MockNode::succeeding(), MockNode::succeeding(), MockNode::succeeding());
    let executor = WorkflowExecutor::new(recorders.executors(), ExecutorConfig::default());
    let wf = workflow(vec![FlowNode::task("a", "A")], vec![Edge::new("e1", "a", "ghost")]);

    let err = executor.run(&wf, CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::UnknownNodeReference { ref node_id, .. }) if node_id == "ghost"
    ));
    assert_eq!(recorders.total_calls(), 0);
}

#[tokio::test]
async fn duplicate_ids_are_rejected_before_any_node_runs() {
    let recorders = Recorders::new(MockNode::succeeding(), MockNode::succeeding(), MockNode::succeeding());
    let executor = WorkflowExecutor::new(recorders.executors(), ExecutorConfig::default());
    let wf = workflow(vec![FlowNode::task("a", "A"), FlowNode::task("a", "A again")], vec![]);

    let err = executor.run(&wf, CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, EngineError::Validation(ValidationError::DuplicateNodeId(ref id)) if id == "a"));
    assert_eq!(recorders.total_calls(), 0);
}

// ============================================================
// Cancellation
// ============================================================

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let recorders = Recorders::new(MockNode::succeeding(), MockNode::succeeding(), MockNode::succeeding());
    let executor = WorkflowExecutor::new(recorders.executors(), ExecutorConfig::default());
    let wf = workflow(vec![FlowNode::task("a", "A")], vec![]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = executor.run(&wf, cancel).await.unwrap();

    assert!(matches!(result.error, Some(EngineError::Cancelled)));
    assert_eq!(result.execution.status, ExecutionStatus::Failed);
    assert_eq!(ids(&result.execution), vec![START_MARKER, CANCELLED_MARKER]);
    assert_eq!(recorders.total_calls(), 0);
}

#[tokio::test]
async fn cancelled_empty_workflow_does_not_succeed() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine().run(&workflow(vec![], vec![]), cancel).await.unwrap();

    assert!(matches!(result.error, Some(EngineError::Cancelled)));
    assert_eq!(result.execution.status, ExecutionStatus::Failed);
    assert_eq!(ids(&result.execution), vec![START_MARKER, CANCELLED_MARKER]);
}

#[tokio::test(start_paused = true)]
async fn cancelling_in_flight_node_aborts_run() {
    let recorders = Recorders::new(MockNode::succeeding(), MockNode::hanging(), MockNode::succeeding());
    let executor = WorkflowExecutor::new(recorders.executors(), ExecutorConfig::default());
    let wf = workflow(
        vec![
            FlowNode::task("a", "A"),
            FlowNode::api("slow", "Slow", OK_URL),
            FlowNode::task("b", "B"),
        ],
        vec![],
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        trigger.cancel();
    });

    let result = executor.run(&wf, cancel).await.unwrap();

    assert!(matches!(result.error, Some(EngineError::Cancelled)));
    let logs = &result.execution.logs;
    let last = logs.last().unwrap();
    assert_eq!(last.node_id, CANCELLED_MARKER);
    assert_eq!(last.status, LogStatus::Failed);
    assert_eq!(logs[logs.len() - 2].node_id, "slow");
    assert_eq!(logs[logs.len() - 2].status, LogStatus::Failed);
    assert_eq!(recorders.task.calls(), vec!["a"]);
}

// ============================================================
// Traversal modes
// ============================================================

fn branching_workflow() -> Workflow {
    workflow(
        vec![
            FlowNode::task("start", "Start"),
            FlowNode::decision("d", "Check", "condition === true"),
            FlowNode::task("yes", "Yes"),
            FlowNode::task("no", "No"),
        ],
        vec![
            Edge::new("e1", "start", "d"),
            Edge::branch("e2", "d", "yes", true),
            Edge::branch("e3", "d", "no", false),
        ],
    )
}

fn executed_nodes(execution: &Execution) -> Vec<&str> {
    execution
        .logs
        .iter()
        .filter(|e| e.message.starts_with("Executing node:"))
        .map(|e| e.node_id.as_str())
        .collect()
}

#[tokio::test]
async fn declaration_mode_runs_both_branches() {
    let executor = WorkflowExecutor::new(executors(MockHttpClient::new(), false), ExecutorConfig::default());
    let result = executor.run(&branching_workflow(), CancellationToken::new()).await.unwrap();

    assert_eq!(executed_nodes(&result.execution), vec!["start", "d", "yes", "no"]);
}

#[tokio::test]
async fn graph_mode_follows_the_chosen_branch() {
    let wf = branching_workflow();

    let taken = graph_engine(true).run(&wf, CancellationToken::new()).await.unwrap();
    assert!(taken.is_success());
    assert_eq!(executed_nodes(&taken.execution), vec!["start", "d", "yes"]);

    let other = graph_engine(false).run(&wf, CancellationToken::new()).await.unwrap();
    assert_eq!(executed_nodes(&other.execution), vec!["start", "d", "no"]);
}

#[tokio::test]
async fn graph_mode_runs_cycles_once() {
    let wf = workflow(
        vec![FlowNode::task("a", "A"), FlowNode::task("b", "B")],
        vec![Edge::new("e1", "a", "b"), Edge::new("e2", "b", "a")],
    );

    let result = graph_engine(true).run(&wf, CancellationToken::new()).await.unwrap();
    assert!(result.is_success());
    assert_eq!(executed_nodes(&result.execution), vec!["a", "b"]);
}

#[tokio::test]
async fn graph_mode_runs_joins_after_all_inputs_and_unrooted_cycles() {
    let wf = workflow(
        vec![
            FlowNode::task("a", "A"),
            FlowNode::task("d", "Join"),
            FlowNode::task("b", "B"),
            FlowNode::task("x", "X"),
            FlowNode::task("y", "Y"),
        ],
        vec![
            Edge::new("e1", "a", "d"),
            Edge::new("e2", "a", "b"),
            Edge::new("e3", "b", "d"),
            Edge::new("e4", "x", "y"),
            Edge::new("e5", "y", "x"),
        ],
    );

    let result = graph_engine(true).run(&wf, CancellationToken::new()).await.unwrap();
    assert!(result.is_success());
    assert_eq!(executed_nodes(&result.execution), vec!["a", "b", "d", "x", "y"]);
}

// ============================================================
// Stored runs
// ============================================================

#[tokio::test]
async fn run_stored_appends_execution() {
    let repo = InMemoryRepository::new();
    let id = repo
        .save(Workflow::new("stored", "u1", vec![FlowNode::task("A", "A")], vec![]))
        .await
        .unwrap();

    let run = engine().run_stored(&repo, &id, CancellationToken::new()).await.unwrap();

    assert!(run.saved.is_ok());
    assert!(run.result.is_success());
    let stored = repo.get(&id).await.unwrap();
    assert_eq!(stored.executions, vec![run.result.execution]);
}

#[tokio::test]
async fn failed_runs_are_recorded_too() {
    let repo = InMemoryRepository::new();
    let id = repo
        .save(Workflow::new(
            "stored",
            "u1",
            vec![FlowNode::api("api", "Down", "http://down.invalid/")],
            vec![],
        ))
        .await
        .unwrap();

    let run = engine().run_stored(&repo, &id, CancellationToken::new()).await.unwrap();

    assert!(!run.result.is_success());
    let stored = repo.get(&id).await.unwrap();
    assert_eq!(stored.executions.len(), 1);
    assert_eq!(stored.executions[0].status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn run_stored_unknown_id_is_persistence_error() {
    let repo = InMemoryRepository::new();
    let err = engine().run_stored(&repo, "missing", CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::Persistence(RepositoryError::NotFound(_))));
}

/// Serves one workflow but refuses to store anything.
struct ReadOnlyRepository(Workflow);

#[async_trait]
impl WorkflowRepository for ReadOnlyRepository {
    async fn get(&self, _id: &str) -> Result<Workflow, RepositoryError> {
        Ok(self.0.clone())
    }

    async fn save(&self, _workflow: Workflow) -> Result<String, RepositoryError> {
        Err(RepositoryError::NotFound("read-only".into()))
    }

    async fn append_execution(&self, id: &str, _execution: &Execution) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound(id.to_owned()))
    }

    async fn list(&self, _user_id: &str, _search: Option<&str>) -> Result<Vec<Workflow>, RepositoryError> {
        Ok(vec![self.0.clone()])
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound(id.to_owned()))
    }
}

#[tokio::test]
async fn save_failure_is_reported_apart_from_run_outcome() {
    let repo = ReadOnlyRepository(workflow(vec![FlowNode::task("A", "A")], vec![]));

    let run = engine().run_stored(&repo, "wf-test", CancellationToken::new()).await.unwrap();

    assert!(run.result.is_success());
    assert!(run.saved.is_err());
}
