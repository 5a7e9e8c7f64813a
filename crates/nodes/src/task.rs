//! Task node: a placeholder for arbitrary business logic.

use async_trait::async_trait;

use crate::journal::{Journal, LogStatus};
use crate::node::{FlowNode, NodeKind};
use crate::traits::{ExecutableNode, ExecutionContext, NodeOutcome};
use crate::NodeError;

/// Always succeeds without side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskNode;

#[async_trait]
impl ExecutableNode for TaskNode {
    async fn execute(
        &self,
        node: &FlowNode,
        journal: &mut Journal,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        let NodeKind::Task(data) = &node.kind else {
            return Err(NodeError::KindMismatch {
                expected: "task",
                actual: node.kind.name(),
            });
        };

        journal.append(
            &node.id,
            LogStatus::Success,
            format!("Task \"{}\" executed successfully", data.label),
        );
        Ok(NodeOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ctx() -> ExecutionContext {
        ExecutionContext { workflow_id: "wf".into(), execution_id: Uuid::now_v7() }
    }

    #[tokio::test]
    async fn logs_one_success_entry() {
        let mut journal = Journal::open();
        let outcome = TaskNode
            .execute(&FlowNode::task("a", "Send report"), &mut journal, &ctx())
            .await
            .expect("task never fails");

        assert_eq!(outcome, NodeOutcome::Completed);
        assert_eq!(journal.len(), 1);
        let entry = &journal.entries()[0];
        assert_eq!(entry.node_id, "a");
        assert_eq!(entry.status, LogStatus::Success);
        assert_eq!(entry.message, "Task \"Send report\" executed successfully");
    }

    #[tokio::test]
    async fn rejects_other_kinds() {
        let mut journal = Journal::open();
        let err = TaskNode
            .execute(&FlowNode::decision("d", "D", "true"), &mut journal, &ctx())
            .await
            .unwrap_err();
        assert_eq!(err, NodeError::KindMismatch { expected: "task", actual: "decision" });
        assert!(journal.is_empty());
    }
}
