//! Test doubles for the node seams.
//!
//! Useful in unit and integration tests where real network access or real
//! condition semantics are either unavailable or irrelevant.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::condition::ConditionEvaluator;
use crate::http::{HttpClient, HttpError, HttpResponse};
use crate::journal::{Journal, LogStatus};
use crate::node::FlowNode;
use crate::traits::{ExecutableNode, ExecutionContext, NodeOutcome};
use crate::NodeError;

// ---------------------------------------------------------------------------
// MockHttpClient
// ---------------------------------------------------------------------------

/// Scripted reply for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Body { status: u16, body: String },
    /// Fail as if the connection was refused.
    Fail(String),
    /// Never answer.
    Hang,
}

/// An [`HttpClient`] that answers from a per-URL script and records every
/// request.  Unscripted URLs fail with a transport error.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: HashMap<String, MockResponse>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: impl Into<String>, response: MockResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    pub fn with_json(self, url: impl Into<String>, status: u16, body: Value) -> Self {
        self.with_response(url, MockResponse::Body { status, body: body.to_string() })
    }

    /// URLs requested so far, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(url.to_owned());

        match self.responses.get(url).cloned() {
            Some(MockResponse::Body { status, body }) => Ok(HttpResponse { status, body }),
            Some(MockResponse::Fail(msg)) => Err(HttpError::Transport(msg)),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Err(HttpError::Transport(format!("connection refused: {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// FixedEvaluator
// ---------------------------------------------------------------------------

/// Always evaluates to the wrapped boolean.
#[derive(Debug, Clone, Copy)]
pub struct FixedEvaluator(pub bool);

impl ConditionEvaluator for FixedEvaluator {
    fn evaluate(&self, _condition: &str) -> Result<bool, NodeError> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// MockNode
// ---------------------------------------------------------------------------

/// Behaviour injected into `MockNode` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Log a success entry and return the outcome.
    Return(NodeOutcome),
    /// Fail with the given error.
    Fail(NodeError),
    /// Never finish.
    Hang,
}

/// A mock executor that records every node it is asked to run.
#[derive(Debug)]
pub struct MockNode {
    pub behaviour: MockBehaviour,
    /// Ids of all nodes seen by this executor (in call order).
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockNode {
    pub fn succeeding() -> Self {
        Self::with(MockBehaviour::Return(NodeOutcome::Completed))
    }

    pub fn failing(err: NodeError) -> Self {
        Self::with(MockBehaviour::Fail(err))
    }

    pub fn hanging() -> Self {
        Self::with(MockBehaviour::Hang)
    }

    pub fn with(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times this executor has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(
        &self,
        node: &FlowNode,
        journal: &mut Journal,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        self.calls.lock().unwrap().push(node.id.clone());

        match &self.behaviour {
            MockBehaviour::Return(outcome) => {
                journal.append(&node.id, LogStatus::Success, format!("{} done", node.label()));
                Ok(*outcome)
            }
            MockBehaviour::Fail(err) => Err(err.clone()),
            MockBehaviour::Hang => std::future::pending().await,
        }
    }
}
