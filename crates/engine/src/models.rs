//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like
//! in memory.  They serialise to/from the JSON document stored by the
//! repository, using the document's camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use nodes::journal::{Execution, ExecutionStatus, LogEntry, LogStatus};
pub use nodes::node::{ApiData, DecisionData, FlowNode, NodeKind, Position, TaskData};

// ---------------------------------------------------------------------------
// WorkflowStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    #[serde(alias = "Draft")]
    Draft,
    Success,
    Failed,
}

impl From<ExecutionStatus> for WorkflowStatus {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Success => Self::Success,
            ExecutionStatus::Failed => Self::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Directed edge from one node to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// `true` / `false` on edges leaving a decision node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
        }
    }

    /// An edge taken only when a decision evaluates to `branch`.
    pub fn branch(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        branch: bool,
    ) -> Self {
        Self {
            label: Some(branch.to_string()),
            ..Self::new(id, source, target)
        }
    }

    /// The decision branch this edge belongs to, if its label names one.
    pub fn branch_label(&self) -> Option<bool> {
        match self.label.as_deref().map(str::trim) {
            Some(l) if l.eq_ignore_ascii_case("true") => Some(true),
            Some(l) if l.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow definition plus its execution history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Assigned by the repository on first save; empty until then.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub last_edited_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub executions: Vec<Execution>,
}

impl Workflow {
    /// Convenience constructor for an unsaved draft.
    pub fn new(
        name: impl Into<String>,
        user_id: impl Into<String>,
        nodes: Vec<FlowNode>,
        edges: Vec<Edge>,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            id: String::new(),
            name: name.into(),
            description: String::new(),
            status: WorkflowStatus::Draft,
            last_edited_by: user_id.clone(),
            user_id,
            last_edited_on: None,
            nodes,
            edges,
            executions: Vec::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges leaving `node_id`, in declaration order.
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Status of the most recent execution, or the stored status if the
    /// workflow has never run.
    pub fn latest_status(&self) -> WorkflowStatus {
        self.executions
            .iter()
            .max_by_key(|e| e.timestamp)
            .map(|e| e.status.into())
            .unwrap_or(self.status)
    }

    /// Case-insensitive match on name or id, as used by list search.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.id.to_lowercase().contains(&term)
    }
}
