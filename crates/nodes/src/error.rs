//! Node-level error type.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// Every variant is fatal to the run; the engine never retries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    /// The endpoint answered with a non-2xx status.
    #[error("API responded with status: {0}")]
    Status(u16),

    /// The request never produced a response (DNS, connect, TLS, …).
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body was not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    InvalidBody(String),

    /// No response within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The condition evaluator could not produce a boolean.
    #[error("condition could not be evaluated: {0}")]
    Condition(String),

    /// An executor was handed a node of a different kind.
    #[error("expected a {expected} node, got {actual}")]
    KindMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The run was cancelled while this node was in flight.
    #[error("run cancelled")]
    Cancelled,
}
