//! Config - unified settings
//!
//! - `types.rs` - resolved `TaskflowConfig` and the on-disk `ConfigFile` layer
//! - `loader.rs` - layered TOML loading and merging

mod loader;
mod types;

pub use loader::{
    load_config_from_file, merge_configs, ConfigLoader, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
};
pub use types::{
    ConfigFile, EngineConfig, EngineSection, HubConfig, HubSection, LoggingConfig,
    LoggingSection, TaskflowConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_ACTIVE_TASKS,
    DEFAULT_MAX_CONCURRENT, DEFAULT_PUBLISH_TIMEOUT_MS, DEFAULT_SUCCESS_RATE,
    DEFAULT_WORK_DELAY_MS,
};
