//! Decision node: evaluates its condition to a boolean branch.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::condition::{ConditionEvaluator, RandomEvaluator};
use crate::journal::{Journal, LogStatus};
use crate::node::{FlowNode, NodeKind};
use crate::traits::{ExecutableNode, ExecutionContext, NodeOutcome};
use crate::NodeError;

pub struct DecisionNode {
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl DecisionNode {
    pub fn new(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self { evaluator }
    }
}

impl Default for DecisionNode {
    fn default() -> Self {
        Self::new(Arc::new(RandomEvaluator))
    }
}

#[async_trait]
impl ExecutableNode for DecisionNode {
    async fn execute(
        &self,
        node: &FlowNode,
        journal: &mut Journal,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        let NodeKind::Decision(data) = &node.kind else {
            return Err(NodeError::KindMismatch {
                expected: "decision",
                actual: node.kind.name(),
            });
        };

        journal.append(
            &node.id,
            LogStatus::Pending,
            format!("Evaluating condition: {}", data.condition),
        );

        match self.evaluator.evaluate(&data.condition) {
            Ok(result) => {
                debug!(node_id = %node.id, result, "condition evaluated");
                journal.append(&node.id, LogStatus::Success, format!("Condition evaluated to {result}"));
                Ok(NodeOutcome::Branch(result))
            }
            Err(err) => {
                journal.append(
                    &node.id,
                    LogStatus::Failed,
                    format!("Decision evaluation failed: {err}"),
                );
                Err(err)
            }
        }
    }
}
