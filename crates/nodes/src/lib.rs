//! `nodes` crate — the node model, the run journal, the `ExecutableNode`
//! trait and the built-in executors for each node kind.
//!
//! The engine crate dispatches on [`NodeKind`] to one of [`TaskNode`],
//! [`ApiNode`] or [`DecisionNode`], all through the [`ExecutableNode`] trait.

pub mod api;
pub mod condition;
pub mod decision;
pub mod error;
pub mod http;
pub mod journal;
pub mod mock;
pub mod node;
pub mod task;
pub mod traits;

pub use api::ApiNode;
pub use condition::{ConditionEvaluator, LiteralEvaluator, RandomEvaluator};
pub use decision::DecisionNode;
pub use error::NodeError;
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use journal::{Execution, ExecutionStatus, Journal, LogEntry, LogStatus};
pub use node::{FlowNode, NodeKind, Position};
pub use task::TaskNode;
pub use traits::{ExecutableNode, ExecutionContext, NodeOutcome};
