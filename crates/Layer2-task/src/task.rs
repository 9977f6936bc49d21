//! Task definition and types

use crate::state::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use taskflow_foundation::Error;
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 characters, for log lines and tables
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::InvalidInput(format!("malformed task id '{}'", s)))
    }
}

/// A submitted task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: TaskId,

    /// Free-text description
    pub description: String,

    /// Priority label, e.g. `HIGH` or `LOW`. Stored only; it never changes
    /// execution order.
    pub priority: String,

    /// Current status
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task started executing
    pub started_at: Option<DateTime<Utc>>,

    /// When the task reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,

    /// Failure message for `FAILED` tasks
    pub error: Option<String>,
}

impl Task {
    /// Create a new queued task
    pub fn new(description: impl Into<String>, priority: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            description: description.into(),
            priority: priority.into(),
            status: TaskStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// Apply a status and stamp the matching timestamp.
    ///
    /// Callers check legality first; see [`TaskStatus::can_transition_to`].
    pub(crate) fn apply(&mut self, status: TaskStatus, error: Option<String>) {
        self.status = status;
        match status {
            TaskStatus::InProgress => self.started_at = Some(Utc::now()),
            TaskStatus::Completed | TaskStatus::Failed => {
                self.completed_at = Some(Utc::now());
                self.error = error;
            }
            TaskStatus::Queued => {}
        }
    }

    /// Check if task is still active (queued or running)
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Get execution duration if task has started
    pub fn duration(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some((end - start).to_std().unwrap_or_default())
    }
}
