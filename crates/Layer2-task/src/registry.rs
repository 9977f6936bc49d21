//! Task Registry - the in-memory task table
//!
//! Every record lives behind one lock. Lookups, transitions and the
//! statistics scan each take the lock once, so a statistics snapshot never
//! sees a half-applied submission or transition.

use crate::state::TaskStatus;
use crate::stats::Statistics;
use crate::task::{Task, TaskId};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use taskflow_foundation::{Error, Result};
use tracing::{debug, error};

/// Task table keyed by id
#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queued task and return its id
    pub fn create(
        &self,
        description: impl Into<String>,
        priority: impl Into<String>,
    ) -> Result<TaskId> {
        let task = Task::new(description, priority);
        let task_id = task.id;
        self.insert(task)?;
        Ok(task_id)
    }

    /// Insert a fully built task. An id that is already taken is an
    /// internal bug and is reported, never overwritten.
    pub fn insert(&self, task: Task) -> Result<()> {
        let mut tasks = self.tasks.write();
        match tasks.entry(task.id) {
            Entry::Occupied(existing) => {
                error!(
                    task_id = %task.id,
                    existing_status = %existing.get().status,
                    "task id collision in registry"
                );
                Err(Error::Internal(format!("task id collision: {}", task.id)))
            }
            Entry::Vacant(slot) => {
                debug!(task_id = %task.id, priority = %task.priority, "task registered");
                slot.insert(task);
                Ok(())
            }
        }
    }

    /// Get a task by ID
    pub fn get(&self, task_id: TaskId) -> Option<Task> {
        self.tasks.read().get(&task_id).cloned()
    }

    /// Current status of a task
    pub fn status(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.tasks.read().get(&task_id).map(|task| task.status)
    }

    /// Move a task to `status`. Returns the previous status.
    pub fn set_status(&self, task_id: TaskId, status: TaskStatus) -> Result<TaskStatus> {
        self.transition(task_id, status, None)
    }

    /// Move a task to `status`, recording `error` on terminal statuses.
    ///
    /// Unknown ids yield `Error::NotFound`; steps outside the lifecycle yield
    /// `Error::InvalidTransition`. Neither changes the table.
    pub fn transition(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        error: Option<String>,
    ) -> Result<TaskStatus> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(&task_id)
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", task_id)))?;

        let previous = task.status;
        if !previous.can_transition_to(status) {
            return Err(Error::invalid_transition(previous, status));
        }

        task.apply(status, error);
        Ok(previous)
    }

    /// Count of tasks per status, taken under one lock
    pub fn statistics(&self) -> Statistics {
        self.tasks.read().values().map(|task| task.status).collect()
    }

    /// Snapshot of every task
    pub fn list(&self) -> Vec<Task> {
        self.tasks.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}
