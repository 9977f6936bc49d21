//! Task executors
//!
//! - `Executor` - the work capability injected into the engine
//! - `SimulatedExecutor` - fixed delay plus weighted random outcome
//! - `FnExecutor` - wraps an async closure, handy for deterministic tests

pub mod simulated;
pub mod r#trait;

pub use r#trait::Executor;
pub use simulated::SimulatedExecutor;

use crate::task::Task;
use async_trait::async_trait;
use futures::future::BoxFuture;
use taskflow_foundation::Result;

/// Executor backed by a closure returning a future
pub struct FnExecutor<F> {
    name: &'static str,
    f: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(Task) -> BoxFuture<'static, Result<()>> + Send + Sync,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

#[async_trait]
impl<F> Executor for FnExecutor<F>
where
    F: Fn(Task) -> BoxFuture<'static, Result<()>> + Send + Sync,
{
    async fn execute(&self, task: &Task) -> Result<()> {
        (self.f)(task.clone()).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
