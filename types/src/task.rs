//! Task lifecycle types.
//!
//! A [`Task`] is the observable snapshot of one tracked asynchronous
//! operation (typically a file upload). The registry in `despacho-runtime`
//! owns the live records; everything here is plain data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TaskId;

/// Lifecycle state of a tracked task.
///
/// `InProgress` is the only non-terminal state. Terminal states are
/// absorbing: the registry ignores any further transition attempt and only
/// removal gets the record out of the visible set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    InProgress,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::InProgress)
    }
}

/// Terminal payload of a task: result and error are mutually exclusive and
/// both absent while the task is in progress or cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Opaque result payload recorded by `complete`.
    Result(serde_json::Value),
    /// Human-readable error message recorded by `fail`.
    Error(String),
}

/// Observable snapshot of one tracked asynchronous operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Human-readable descriptor, e.g. the uploaded file name.
    pub label: String,
    /// Consumer-facing filter tag, e.g. the kind of upload.
    pub category: String,
    /// Free-form metadata supplied at start time; opaque to the registry.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
    pub state: TaskState,
    /// Percentage in [0, 99] while in progress; exactly 100 after success.
    pub progress: u8,
    pub started_at: DateTime<Utc>,
    /// Unset while the task is in progress.
    pub ended_at: Option<DateTime<Utc>>,
    /// Set by the terminal transition, if any carries a payload.
    pub outcome: Option<TaskOutcome>,
}

impl Task {
    /// Fresh in-progress task with zero progress.
    #[must_use]
    pub fn started(label: impl Into<String>, category: impl Into<String>, extra: serde_json::Value) -> Self {
        Self {
            id: TaskId::generate(),
            label: label.into(),
            category: category.into(),
            extra,
            state: TaskState::InProgress,
            progress: 0,
            started_at: Utc::now(),
            ended_at: None,
            outcome: None,
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            Some(TaskOutcome::Result(value)) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Some(TaskOutcome::Error(message)) => Some(message),
            _ => None,
        }
    }
}
