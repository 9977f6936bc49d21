//! # taskflow-foundation
//!
//! Foundation layer for Taskflow:
//! - Error: the shared `Error` enum and `Result` alias
//! - Config: layered TOML configuration (`TaskflowConfig`)

pub mod config;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    ConfigFile, ConfigLoader, EngineConfig, HubConfig, LoggingConfig, TaskflowConfig,
    CONFIG_DIR_NAME, CONFIG_FILE_NAME,
};
