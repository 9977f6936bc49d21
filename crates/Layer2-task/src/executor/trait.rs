//! Executor trait

use crate::task::Task;
use async_trait::async_trait;
use taskflow_foundation::Result;

/// Executor trait - implement to plug in the work a task performs.
///
/// `Ok` completes the task, `Err` fails it with the error's message.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Perform the task's work
    async fn execute(&self, task: &Task) -> Result<()>;

    /// Get executor name
    fn name(&self) -> &'static str;
}
