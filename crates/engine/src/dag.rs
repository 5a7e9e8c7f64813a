//! Graph validation — run this before persisting or executing a workflow.
//!
//! Rules enforced, in order:
//! 1. Node IDs must be unique within the workflow.
//! 2. Every edge must reference valid node IDs (both `source` and `target`).
//! 3. A decision node with any outgoing edge must have both a `true` and a
//!    `false` labelled outgoing edge.  Decision nodes without outgoing edges
//!    are leaves and pass.
//!
//! Cycles are allowed; the traversal visits each node at most once.  A
//! workflow with no nodes is valid and runs as a no-op.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::models::Workflow;

/// Validate the workflow's graph structure.
///
/// # Errors
/// - [`ValidationError::DuplicateNodeId`] if two nodes share an ID.
/// - [`ValidationError::UnknownNodeReference`] if an edge references a missing node.
/// - [`ValidationError::MissingBranch`] if a decision node lacks a branch edge.
pub fn validate_workflow(workflow: &Workflow) -> Result<(), ValidationError> {
    // -----------------------------------------------------------------------
    // 1. Ensure node IDs are unique
    // -----------------------------------------------------------------------
    let mut node_set: HashSet<&str> = HashSet::with_capacity(workflow.nodes.len());
    for node in &workflow.nodes {
        if !node_set.insert(node.id.as_str()) {
            return Err(ValidationError::DuplicateNodeId(node.id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Validate edge endpoints
    // -----------------------------------------------------------------------
    for edge in &workflow.edges {
        for (side, node_id) in [("source", &edge.source), ("target", &edge.target)] {
            if !node_set.contains(node_id.as_str()) {
                return Err(ValidationError::UnknownNodeReference {
                    edge_id: edge.id.clone(),
                    node_id: node_id.clone(),
                    side,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // 3. Decision nodes need both branches once they branch at all
    // -----------------------------------------------------------------------
    for node in workflow.nodes.iter().filter(|n| n.is_decision()) {
        let mut outgoing = workflow.outgoing(&node.id).peekable();
        if outgoing.peek().is_none() {
            continue;
        }

        let (mut has_true, mut has_false) = (false, false);
        for edge in outgoing {
            match edge.branch_label() {
                Some(true) => has_true = true,
                Some(false) => has_false = true,
                None => {}
            }
        }

        for (present, branch) in [(has_true, true), (has_false, false)] {
            if !present {
                return Err(ValidationError::MissingBranch {
                    node_id: node.id.clone(),
                    branch,
                });
            }
        }
    }

    Ok(())
}
