//! Config types
//!
//! `TaskflowConfig` is the resolved configuration handed to the engine and
//! the hub. `ConfigFile` mirrors one TOML file on disk, where every field is
//! optional so that layered files can be merged before defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of tasks executing at once
pub const DEFAULT_MAX_CONCURRENT: usize = 64;

/// Default bound on non-terminal tasks before submissions are refused
pub const DEFAULT_MAX_ACTIVE_TASKS: usize = 10_000;

/// Default simulated work interval
pub const DEFAULT_WORK_DELAY_MS: u64 = 5_000;

/// Default probability that simulated work succeeds
pub const DEFAULT_SUCCESS_RATE: f64 = 0.8;

/// Default per-subscriber queue capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;

/// Default time a publish waits on a full subscriber queue
pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// Resolved config
// ============================================================================

/// Taskflow configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskflowConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TaskflowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.engine.max_concurrent == 0 {
            return Err(Error::Config(
                "engine.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.engine.max_active_tasks == 0 {
            return Err(Error::Config(
                "engine.max_active_tasks must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.engine.success_rate) {
            return Err(Error::Config(format!(
                "engine.success_rate must be within [0, 1], got {}",
                self.engine.success_rate
            )));
        }
        if self.hub.channel_capacity == 0 {
            return Err(Error::Config(
                "hub.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Execution engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum tasks executing at once; the rest wait in `QUEUED`
    pub max_concurrent: usize,

    /// Maximum non-terminal tasks; further submissions fail fast
    pub max_active_tasks: usize,

    /// Simulated work interval in milliseconds
    pub work_delay_ms: u64,

    /// Probability in `[0, 1]` that simulated work completes
    pub success_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_active_tasks: DEFAULT_MAX_ACTIVE_TASKS,
            work_delay_ms: DEFAULT_WORK_DELAY_MS,
            success_rate: DEFAULT_SUCCESS_RATE,
        }
    }
}

impl EngineConfig {
    pub fn work_delay(&self) -> Duration {
        Duration::from_millis(self.work_delay_ms)
    }
}

/// Notification hub settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Capacity of each subscriber queue
    pub channel_capacity: usize,

    /// How long a publish waits on a full queue before evicting that
    /// subscriber. `0` waits forever.
    pub publish_timeout_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            publish_timeout_ms: DEFAULT_PUBLISH_TIMEOUT_MS,
        }
    }
}

impl HubConfig {
    pub fn publish_timeout(&self) -> Option<Duration> {
        match self.publish_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// On-disk layer
// ============================================================================

/// One config file. Unset fields fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub hub: HubSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    pub max_concurrent: Option<usize>,
    pub max_active_tasks: Option<usize>,
    pub work_delay_ms: Option<u64>,
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubSection {
    pub channel_capacity: Option<usize>,
    pub publish_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    pub level: Option<String>,
}

impl ConfigFile {
    /// Apply defaults to every unset field
    pub fn resolve(self) -> TaskflowConfig {
        let engine = EngineConfig::default();
        let hub = HubConfig::default();
        let logging = LoggingConfig::default();

        TaskflowConfig {
            engine: EngineConfig {
                max_concurrent: self.engine.max_concurrent.unwrap_or(engine.max_concurrent),
                max_active_tasks: self
                    .engine
                    .max_active_tasks
                    .unwrap_or(engine.max_active_tasks),
                work_delay_ms: self.engine.work_delay_ms.unwrap_or(engine.work_delay_ms),
                success_rate: self.engine.success_rate.unwrap_or(engine.success_rate),
            },
            hub: HubConfig {
                channel_capacity: self.hub.channel_capacity.unwrap_or(hub.channel_capacity),
                publish_timeout_ms: self
                    .hub
                    .publish_timeout_ms
                    .unwrap_or(hub.publish_timeout_ms),
            },
            logging: LoggingConfig {
                level: self.logging.level.unwrap_or(logging.level),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TaskflowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hub.channel_capacity, 10);
        assert_eq!(config.engine.work_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TaskflowConfig::default();
        config.engine.success_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = TaskflowConfig::default();
        config.hub.channel_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = TaskflowConfig::default();
        config.engine.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_publish_timeout_waits_forever() {
        let hub = HubConfig {
            publish_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(hub.publish_timeout(), None);
    }

    #[test]
    fn test_resolve_partial_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            [engine]
            work_delay_ms = 250

            [hub]
            channel_capacity = 4
            "#,
        )
        .unwrap();

        let config = file.resolve();
        assert_eq!(config.engine.work_delay_ms, 250);
        assert_eq!(config.engine.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.hub.channel_capacity, 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = TaskflowConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed: TaskflowConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
