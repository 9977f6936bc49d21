//! Simulated executor - a fixed delay and a weighted coin flip

use super::Executor;
use crate::task::Task;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use taskflow_foundation::{EngineConfig, Error, Result};
use tracing::debug;

/// Stands in for real work: sleeps for `delay`, then succeeds with
/// probability `success_rate`.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    delay: Duration,
    success_rate: f64,
}

impl SimulatedExecutor {
    /// `success_rate` is clamped to `[0, 1]`; NaN counts as `0`.
    pub fn new(delay: Duration, success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self {
            delay,
            success_rate,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.work_delay(), config.success_rate)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[async_trait]
impl Executor for SimulatedExecutor {
    async fn execute(&self, task: &Task) -> Result<()> {
        tokio::time::sleep(self.delay).await;

        let succeeded = rand::thread_rng().gen_bool(self.success_rate);
        debug!(task_id = %task.id, succeeded, "simulated work finished");

        if succeeded {
            Ok(())
        } else {
            Err(Error::Task(format!(
                "simulated failure for '{}'",
                task.description
            )))
        }
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
