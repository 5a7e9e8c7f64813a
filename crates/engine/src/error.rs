//! Engine-level error types.

use thiserror::Error;

use crate::repository::RepositoryError;

/// Why a workflow graph was rejected before execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node ID that doesn't exist in the workflow.
    #[error("edge '{edge_id}' references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        edge_id: String,
        node_id: String,
        side: &'static str,
    },

    /// A decision node with outgoing edges lacks one of its two branches.
    #[error("decision node '{node_id}' has no outgoing edge labelled '{branch}'")]
    MissingBranch { node_id: String, branch: bool },
}

/// Errors produced by the workflow engine (validation, execution, storage).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The graph is malformed; the run never started.
    #[error("invalid workflow: {0}")]
    Validation(#[from] ValidationError),

    /// A node failed; the whole run is aborted.
    #[error("node '{node_id}' failed: {source}")]
    NodeExecution {
        node_id: String,
        #[source]
        source: nodes::NodeError,
    },

    /// The caller cancelled the run.
    #[error("run cancelled")]
    Cancelled,

    /// Loading or saving through the workflow repository failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}
