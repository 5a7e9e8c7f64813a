//! The `ExecutableNode` trait — the contract every node executor must fulfil.

use async_trait::async_trait;
use uuid::Uuid;

use crate::journal::Journal;
use crate::node::FlowNode;
use crate::NodeError;

/// Shared context passed to every node during execution.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the parent workflow (empty for workflows never saved).
    pub workflow_id: String,
    /// ID of the current execution run.
    pub execution_id: Uuid,
}

/// What a node reports back to the engine on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    /// The node finished; all outgoing edges apply.
    Completed,
    /// A decision node picked a branch.
    Branch(bool),
}

/// The core node trait.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute `node`, writing progress to `journal`.
    ///
    /// The engine logs the leading `pending` entry and, on error, the node's
    /// `failed` entry; implementations log only what happens in between.
    async fn execute(
        &self,
        node: &FlowNode,
        journal: &mut Journal,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError>;
}
