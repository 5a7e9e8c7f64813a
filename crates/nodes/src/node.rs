//! Graph node model.
//!
//! A node's `type` selects both its payload shape and the executor that runs
//! it.  On the wire a node looks like the editor writes it:
//!
//! ```json
//! { "id": "2", "type": "api", "position": { "x": 10, "y": 40 },
//!   "data": { "label": "Fetch", "endpoint": "https://…", "description": "" } }
//! ```

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Canvas coordinates.  Presentation only; never read during execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

// ---------------------------------------------------------------------------
// Per-kind payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    pub label: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiData {
    pub label: String,
    /// URL fetched with a plain GET.
    pub endpoint: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionData {
    pub label: String,
    /// Free-text condition handed to the configured `ConditionEvaluator`.
    #[serde(default)]
    pub condition: String,
}

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// The kind of a node together with the fields that kind requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum NodeKind {
    Task(TaskData),
    Api(ApiData),
    Decision(DecisionData),
}

impl NodeKind {
    /// Lower-case kind name, matching the serialised `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Task(_) => "task",
            Self::Api(_) => "api",
            Self::Decision(_) => "decision",
        }
    }
}

// ---------------------------------------------------------------------------
// FlowNode
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    /// Unique identifier within this workflow (referenced by edges).
    pub id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl FlowNode {
    pub fn task(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            kind: NodeKind::Task(TaskData {
                label: label.into(),
                description: String::new(),
            }),
        }
    }

    pub fn api(id: impl Into<String>, label: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            kind: NodeKind::Api(ApiData {
                label: label.into(),
                endpoint: endpoint.into(),
                description: String::new(),
            }),
        }
    }

    pub fn decision(
        id: impl Into<String>,
        label: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            kind: NodeKind::Decision(DecisionData {
                label: label.into(),
                condition: condition.into(),
            }),
        }
    }

    /// Human-readable label, whatever the kind.
    pub fn label(&self) -> &str {
        match &self.kind {
            NodeKind::Task(d) => &d.label,
            NodeKind::Api(d) => &d.label,
            NodeKind::Decision(d) => &d.label,
        }
    }

    pub fn is_decision(&self) -> bool {
        matches!(self.kind, NodeKind::Decision(_))
    }
}
