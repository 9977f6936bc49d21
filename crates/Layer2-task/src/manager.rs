//! Task Manager - the execution engine
//!
//! Every submission gets its own tokio task which drives the lifecycle:
//!
//! 1. wait for a run slot (the task stays `QUEUED` meanwhile)
//! 2. `IN_PROGRESS`, persisted to the registry then published to the hub
//! 3. the injected [`Executor`] does the work
//! 4. `COMPLETED` or `FAILED`, persisted then published
//!
//! Two semaphores bound resource use: `max_concurrent` run slots, and
//! `max_active_tasks` admission permits held from submission until the
//! terminal status has been published.

use crate::executor::{Executor, SimulatedExecutor};
use crate::hub::NotificationHub;
use crate::registry::TaskRegistry;
use crate::state::TaskStatus;
use crate::task::{Task, TaskId};
use std::sync::Arc;
use std::time::Duration;
use taskflow_foundation::{EngineConfig, Error, HubConfig, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

/// Task Manager - handles task lifecycle and execution
#[derive(Clone)]
pub struct TaskManager {
    /// All tasks by ID
    registry: Arc<TaskRegistry>,

    /// Status fan-out
    hub: Arc<NotificationHub>,

    /// The work each task performs
    executor: Arc<dyn Executor>,

    /// Limits tasks running at once
    run_slots: Arc<Semaphore>,

    /// Limits non-terminal tasks
    admission: Arc<Semaphore>,

    /// Configuration
    config: Arc<EngineConfig>,
}

impl TaskManager {
    /// Create a task manager with the simulated executor
    pub fn new(engine: EngineConfig, hub: &HubConfig) -> Self {
        let executor = Arc::new(SimulatedExecutor::from_config(&engine));
        Self::with_executor(engine, hub, executor)
    }

    /// Create a task manager with its own registry and hub
    pub fn with_executor(
        engine: EngineConfig,
        hub: &HubConfig,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self::with_parts(
            Arc::new(TaskRegistry::new()),
            Arc::new(NotificationHub::with_config(hub)),
            executor,
            engine,
        )
    }

    /// Create a task manager over an existing registry and hub
    pub fn with_parts(
        registry: Arc<TaskRegistry>,
        hub: Arc<NotificationHub>,
        executor: Arc<dyn Executor>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            hub,
            executor,
            run_slots: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            admission: Arc::new(Semaphore::new(config.max_active_tasks.max(1))),
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// Submit a new task and start executing it in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        description: impl Into<String>,
        priority: impl Into<String>,
    ) -> Result<TaskId> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::Internal("task submitted outside a tokio runtime".to_string()))?;

        let admission = Arc::clone(&self.admission).try_acquire_owned().map_err(|_| {
            warn!(
                max_active_tasks = self.config.max_active_tasks,
                "submission refused, too many active tasks"
            );
            Error::CapacityExceeded(format!(
                "{} tasks are already queued or running",
                self.config.max_active_tasks
            ))
        })?;

        let priority = priority.into();
        let task_id = self.registry.create(description, priority.clone())?;
        self.hub.ensure_channel(task_id);

        info!(task_id = %task_id, priority = %priority, "task submitted");

        let manager = self.clone();
        runtime.spawn(async move { manager.run(task_id, admission).await });

        Ok(task_id)
    }

    /// Drive one task through its lifecycle
    async fn run(self, task_id: TaskId, _admission: OwnedSemaphorePermit) {
        // the semaphore is never closed
        let _slot = Arc::clone(&self.run_slots).acquire_owned().await.ok();

        if !self.advance(task_id, TaskStatus::InProgress, None).await {
            return;
        }
        let Some(task) = self.registry.get(task_id) else {
            return;
        };

        let (status, message) = self.execute(task).await;
        if self.advance(task_id, status, message.clone()).await {
            match message {
                Some(message) => info!(task_id = %task_id, error = %message, "task failed"),
                None => info!(task_id = %task_id, "task completed"),
            }
        }
    }

    /// Run the executor on its own tokio task so a panic only fails this task
    async fn execute(&self, task: Task) -> (TaskStatus, Option<String>) {
        let task_id = task.id;
        let executor = Arc::clone(&self.executor);
        let work = tokio::spawn(async move { executor.execute(&task).await });

        match work.await {
            Ok(Ok(())) => (TaskStatus::Completed, None),
            Ok(Err(e)) => (TaskStatus::Failed, Some(e.to_string())),
            Err(join_error) => {
                error!(task_id = %task_id, error = %join_error, "executor aborted");
                (
                    TaskStatus::Failed,
                    Some(format!("executor aborted: {}", join_error)),
                )
            }
        }
    }

    /// Persist a transition, then publish it. Returns `false` if the
    /// registry refused it.
    async fn advance(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        message: Option<String>,
    ) -> bool {
        match self.registry.transition(task_id, status, message) {
            Ok(previous) => {
                debug!(task_id = %task_id, from = %previous, to = %status, "task transition");
            }
            Err(Error::NotFound(_)) => {
                warn!(task_id = %task_id, status = %status, "transition for unknown task dropped");
                return false;
            }
            Err(e) => {
                error!(task_id = %task_id, status = %status, error = %e, "transition rejected");
                return false;
            }
        }

        if self.hub.publish(task_id, status).await.is_none() {
            debug!(task_id = %task_id, "no notification channel for task");
        }
        true
    }

    /// Get a task by ID
    pub fn get(&self, task_id: TaskId) -> Option<Task> {
        self.registry.get(task_id)
    }

    /// Tasks currently holding a run slot
    pub fn running_count(&self) -> usize {
        self.config.max_concurrent.max(1) - self.run_slots.available_permits()
    }

    /// Tasks submitted but not yet finished
    pub fn active_count(&self) -> usize {
        self.config.max_active_tasks.max(1) - self.admission.available_permits()
    }

    /// Wait for a task to reach its terminal status
    pub async fn wait(&self, task_id: TaskId, timeout: Option<Duration>) -> Result<TaskStatus> {
        let wait = self.wait_terminal(task_id);
        match timeout {
            Some(duration) => tokio::time::timeout(duration, wait).await.map_err(|_| {
                Error::Timeout(format!(
                    "task {} not finished after {:?}",
                    task_id, duration
                ))
            })?,
            None => wait.await,
        }
    }

    async fn wait_terminal(&self, task_id: TaskId) -> Result<TaskStatus> {
        loop {
            let mut subscription = self
                .hub
                .subscribe(task_id)
                .ok_or_else(|| Error::NotFound(format!("Task {} not found", task_id)))?;

            while let Some(status) = subscription.recv().await {
                if status.is_terminal() {
                    return Ok(status);
                }
            }

            // evicted by the hub before the end; the registry may already
            // hold the outcome
            if let Some(status) = self.registry.status(task_id).filter(TaskStatus::is_terminal) {
                return Ok(status);
            }
        }
    }
}
