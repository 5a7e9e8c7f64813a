//! `engine` crate — workflow model, graph validation, traversal, the
//! execution engine and the repository it persists through.

pub mod models;
pub mod error;
pub mod dag;
pub mod traversal;
pub mod executor;
pub mod repository;
pub mod trigger;

pub use models::{Edge, Execution, ExecutionStatus, FlowNode, LogEntry, LogStatus, Workflow, WorkflowStatus};
pub use error::{EngineError, ValidationError};
pub use dag::validate_workflow;
pub use traversal::TraversalMode;
pub use executor::{ExecutionResult, ExecutorConfig, NodeExecutors, WorkflowExecutor};
pub use repository::{InMemoryRepository, PgWorkflowRepository, RepositoryError, WorkflowRepository};
pub use trigger::TriggeredRun;

#[cfg(test)]
mod executor_tests;
