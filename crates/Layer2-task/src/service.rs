//! Task Service - the string-keyed facade over the engine
//!
//! Ids cross this boundary as their canonical hyphenated text. Polling an id
//! the registry does not know answers [`UNKNOWN_TASK`]; streaming one fails
//! with `Error::NotFound` straight away.

use crate::executor::Executor;
use crate::hub::StatusSubscription;
use crate::manager::TaskManager;
use crate::state::{TaskStatus, UNKNOWN_TASK};
use crate::stats::Statistics;
use crate::task::{Task, TaskId};
use std::sync::Arc;
use std::time::Duration;
use taskflow_foundation::{Error, Result, TaskflowConfig};
use tracing::debug;

/// Public task operations
#[derive(Clone)]
pub struct TaskService {
    manager: TaskManager,
}

impl TaskService {
    /// Service running the simulated executor
    pub fn new(config: &TaskflowConfig) -> Self {
        Self {
            manager: TaskManager::new(config.engine.clone(), &config.hub),
        }
    }

    /// Service running a custom executor
    pub fn with_executor(config: &TaskflowConfig, executor: Arc<dyn Executor>) -> Self {
        Self {
            manager: TaskManager::with_executor(config.engine.clone(), &config.hub, executor),
        }
    }

    pub fn manager(&self) -> &TaskManager {
        &self.manager
    }

    /// Register a task and start it. Returns the new id.
    pub fn submit_task(&self, description: &str, priority: &str) -> Result<String> {
        self.manager
            .submit(description, priority)
            .map(|id| id.to_string())
    }

    /// Current status name, or `"UNKNOWN TASK"`
    pub fn check_task_status(&self, task_id: &str) -> String {
        task_id
            .parse::<TaskId>()
            .ok()
            .and_then(|id| self.poll(id))
            .map(|status| status.to_string())
            .unwrap_or_else(|| UNKNOWN_TASK.to_string())
    }

    /// Stream of status updates ending after the terminal status
    pub fn stream_task_status(&self, task_id: &str) -> Result<StatusSubscription> {
        let subscription = task_id
            .parse::<TaskId>()
            .ok()
            .and_then(|id| self.manager.hub().subscribe(id));

        match subscription {
            Some(subscription) => Ok(subscription),
            None => {
                debug!(task_id = %task_id, "stream requested for unknown task");
                Err(Error::NotFound("task not found".to_string()))
            }
        }
    }

    /// Count of tasks per status
    pub fn get_statistics(&self) -> Statistics {
        self.manager.registry().statistics()
    }

    /// Typed poll
    pub fn poll(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.manager.registry().status(task_id)
    }

    /// Full task record
    pub fn task(&self, task_id: &str) -> Option<Task> {
        task_id
            .parse::<TaskId>()
            .ok()
            .and_then(|id| self.manager.get(id))
    }

    /// Wait for the terminal status of a task
    pub async fn wait_task(
        &self,
        task_id: &str,
        timeout: Option<Duration>,
    ) -> Result<TaskStatus> {
        let id = task_id
            .parse::<TaskId>()
            .map_err(|_| Error::NotFound("task not found".to_string()))?;
        self.manager.wait(id, timeout).await
    }
}
