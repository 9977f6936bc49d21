//! Aggregate status counts

use crate::state::TaskStatus;
use serde::{Deserialize, Serialize};

/// Point-in-time count of tasks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub queued: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub failed: u64,
}

impl Statistics {
    /// Count one task with the given status
    pub fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Queued => self.queued += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
        }
    }

    /// Count for a single status
    pub fn count(&self, status: TaskStatus) -> u64 {
        match status {
            TaskStatus::Queued => self.queued,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
            TaskStatus::Failed => self.failed,
        }
    }

    /// Total number of tasks ever created
    pub fn total(&self) -> u64 {
        self.queued + self.in_progress + self.completed + self.failed
    }

    /// Tasks that have not reached a terminal status
    pub fn active(&self) -> u64 {
        self.queued + self.in_progress
    }
}

impl FromIterator<TaskStatus> for Statistics {
    fn from_iter<I: IntoIterator<Item = TaskStatus>>(iter: I) -> Self {
        let mut stats = Statistics::default();
        for status in iter {
            stats.record(status);
        }
        stats
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<12} {:>8}", "STATUS", "COUNT")?;
        writeln!(f, "{}", "-".repeat(21))?;
        for status in TaskStatus::ALL {
            writeln!(f, "{:<12} {:>8}", status.as_str(), self.count(status))?;
        }
        writeln!(f, "{}", "-".repeat(21))?;
        write!(f, "{:<12} {:>8}", "TOTAL", self.total())
    }
}
