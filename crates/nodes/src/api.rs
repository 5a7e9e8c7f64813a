//! API node: fetches its endpoint and expects a JSON reply.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::{HttpClient, HttpError};
use crate::journal::{Journal, LogStatus};
use crate::node::{FlowNode, NodeKind};
use crate::traits::{ExecutableNode, ExecutionContext, NodeOutcome};
use crate::NodeError;

/// Default upper bound on a single API call.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ApiNode {
    client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl ApiNode {
    pub fn new(client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn call(&self, endpoint: &str) -> Result<usize, NodeError> {
        // The client may carry its own timeout too; this one is authoritative.
        let response = tokio::time::timeout(self.timeout, self.client.get(endpoint))
            .await
            .map_err(|_| NodeError::Timeout(self.timeout))?
            .map_err(|e| match e {
                HttpError::Timeout => NodeError::Timeout(self.timeout),
                other => NodeError::Transport(other.to_string()),
            })?;

        if !response.is_success() {
            return Err(NodeError::Status(response.status));
        }

        let body: Value =
            serde_json::from_str(&response.body).map_err(|e| NodeError::InvalidBody(e.to_string()))?;
        Ok(item_count(&body))
    }
}

/// Number of items in a JSON reply: array length, object key count, else 0.
fn item_count(body: &Value) -> usize {
    match body {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    }
}

#[async_trait]
impl ExecutableNode for ApiNode {
    async fn execute(
        &self,
        node: &FlowNode,
        journal: &mut Journal,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        let NodeKind::Api(data) = &node.kind else {
            return Err(NodeError::KindMismatch {
                expected: "api",
                actual: node.kind.name(),
            });
        };

        journal.append(
            &node.id,
            LogStatus::Pending,
            format!("Making API call to {}", data.endpoint),
        );

        match self.call(&data.endpoint).await {
            Ok(items) => {
                debug!(node_id = %node.id, items, "API call succeeded");
                journal.append(
                    &node.id,
                    LogStatus::Success,
                    format!("API call successful. Received {items} items."),
                );
                Ok(NodeOutcome::Completed)
            }
            Err(err) => {
                warn!(node_id = %node.id, endpoint = %data.endpoint, "API call failed: {}", err);
                journal.append(&node.id, LogStatus::Failed, format!("API call failed: {err}"));
                Err(err)
            }
        }
    }
}
