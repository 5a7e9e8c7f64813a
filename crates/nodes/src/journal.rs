//! Per-run execution journal.
//!
//! The engine opens one [`Journal`] per run, lends it `&mut` to each node
//! executor in turn, and finally seals it into an immutable [`Execution`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Synthetic log ids used for run-level entries.
pub const START_MARKER: &str = "start";
pub const COMPLETE_MARKER: &str = "complete";
pub const ERROR_MARKER: &str = "error";
pub const CANCELLED_MARKER: &str = "cancelled";

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One line of an execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Node id, or one of the `*_MARKER` constants.
    #[serde(rename = "id")]
    pub node_id: String,
    pub status: LogStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A sealed run record.  Only ever produced by [`Journal::seal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub logs: Vec<LogEntry>,
}

impl Execution {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Append-only accumulator for a single run.
#[derive(Debug)]
pub struct Journal {
    execution_id: Uuid,
    started_at: DateTime<Utc>,
    entries: Vec<LogEntry>,
}

impl Journal {
    /// Open a journal for a fresh run with a time-ordered id.
    pub fn open() -> Self {
        Self::new(Uuid::now_v7())
    }

    pub fn new(execution_id: Uuid) -> Self {
        Self {
            execution_id,
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Append an entry stamped with the current time.
    ///
    /// Timestamps never go backwards within a journal, even if the wall clock
    /// does.
    pub fn append(&mut self, node_id: impl Into<String>, status: LogStatus, message: impl Into<String>) {
        let floor = self.entries.last().map_or(self.started_at, |last| last.timestamp);
        let timestamp = Utc::now().max(floor);

        self.entries.push(LogEntry {
            node_id: node_id.into(),
            status,
            message: message.into(),
            timestamp,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot the journal into an [`Execution`] with the given status.
    pub fn seal(&self, status: ExecutionStatus) -> Execution {
        Execution {
            id: self.execution_id,
            timestamp: self.started_at,
            status,
            logs: self.entries.clone(),
        }
    }
}
