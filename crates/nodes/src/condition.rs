//! Decision-node condition evaluation.
//!
//! Condition text is free-form and currently carries no agreed grammar, so
//! evaluation sits behind [`ConditionEvaluator`].

use rand::Rng;

use crate::NodeError;

/// Turns a decision node's condition into a boolean.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, condition: &str) -> Result<bool, NodeError>;
}

/// Ignores the condition and flips a fair coin.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomEvaluator;

impl ConditionEvaluator for RandomEvaluator {
    fn evaluate(&self, _condition: &str) -> Result<bool, NodeError> {
        Ok(rand::thread_rng().gen_bool(0.5))
    }
}

/// Accepts boolean literals and comparisons of a literal against a boolean.
///
/// `true`, `FALSE`, `condition === true`, `flag == false`, `x != true` are all
/// understood; the left-hand side of a comparison is treated as `true`, which
/// matches the editor's default condition `condition === true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralEvaluator;

impl ConditionEvaluator for LiteralEvaluator {
    fn evaluate(&self, condition: &str) -> Result<bool, NodeError> {
        let text = condition.trim();
        if let Some(value) = parse_bool(text) {
            return Ok(value);
        }

        // Longest operators first so `===` is not read as `==`.
        for (op, negate) in [("!==", true), ("===", false), ("!=", true), ("==", false)] {
            if let Some((_, rhs)) = text.split_once(op) {
                return parse_bool(rhs.trim())
                    .map(|value| value != negate)
                    .ok_or_else(|| NodeError::Condition(format!("unsupported condition '{condition}'")));
            }
        }

        Err(NodeError::Condition(format!("unsupported condition '{condition}'")))
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
