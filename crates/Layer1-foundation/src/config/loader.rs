//! Configuration Loader
//!
//! ## Search order
//!
//! 1. User-level: `~/.taskflow/config.toml`
//! 2. Project-level: `.taskflow/config.toml`
//! 3. Explicit path passed on the command line
//!
//! Each level overrides the one before it.

use super::types::{ConfigFile, EngineSection, HubSection, LoggingSection, TaskflowConfig};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Config directory name
pub const CONFIG_DIR_NAME: &str = ".taskflow";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

// ============================================================================
// ConfigLoader
// ============================================================================

/// Layered config loader
pub struct ConfigLoader {
    /// Search paths, lowest priority first
    search_paths: Vec<ConfigPath>,

    /// Explicit file that must exist when set
    explicit: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct ConfigPath {
    path: PathBuf,
    /// Higher wins
    priority: u8,
    description: &'static str,
}

impl ConfigLoader {
    /// Loader with the default user and project search paths
    pub fn new(working_dir: &Path) -> Self {
        let mut paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            paths.push(ConfigPath {
                path: home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
                priority: 10,
                description: "User config",
            });
        }

        paths.push(ConfigPath {
            path: working_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
            priority: 20,
            description: "Project config",
        });

        paths.sort_by_key(|p| p.priority);

        Self {
            search_paths: paths,
            explicit: None,
        }
    }

    /// Loader over custom paths, in increasing priority
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        let search_paths = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| ConfigPath {
                path,
                priority: i as u8,
                description: "Custom",
            })
            .collect();

        Self {
            search_paths,
            explicit: None,
        }
    }

    /// Add a highest-priority file that is required to exist
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Load every layer, merge, apply defaults and validate
    pub fn load_all(&self) -> Result<TaskflowConfig> {
        let mut merged = ConfigFile::default();

        for config_path in &self.search_paths {
            if !config_path.path.exists() {
                continue;
            }
            match load_config_from_file(&config_path.path) {
                Ok(file) => {
                    info!(
                        "Loaded {} from: {}",
                        config_path.description,
                        config_path.path.display()
                    );
                    merged = merge_configs(merged, file);
                }
                Err(e) => {
                    warn!(
                        "Failed to load config from {}: {}",
                        config_path.path.display(),
                        e
                    );
                }
            }
        }

        if let Some(path) = &self.explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            merged = merge_configs(merged, load_config_from_file(path)?);
            info!("Loaded explicit config from: {}", path.display());
        }

        let config = merged.resolve();
        config.validate()?;
        Ok(config)
    }

    /// Existing config files, lowest priority first
    pub fn existing_files(&self) -> Vec<PathBuf> {
        self.search_paths
            .iter()
            .map(|p| &p.path)
            .chain(self.explicit.iter())
            .filter(|p| p.exists())
            .cloned()
            .collect()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse a single TOML config file
pub fn load_config_from_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)?;

    let file: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Invalid config at {}: {}", path.display(), e))
    })?;

    debug!("Parsed config file {}", path.display());
    Ok(file)
}

/// Merge two layers; `later` overrides `earlier`
pub fn merge_configs(earlier: ConfigFile, later: ConfigFile) -> ConfigFile {
    ConfigFile {
        engine: EngineSection {
            max_concurrent: later.engine.max_concurrent.or(earlier.engine.max_concurrent),
            max_active_tasks: later
                .engine
                .max_active_tasks
                .or(earlier.engine.max_active_tasks),
            work_delay_ms: later.engine.work_delay_ms.or(earlier.engine.work_delay_ms),
            success_rate: later.engine.success_rate.or(earlier.engine.success_rate),
        },
        hub: HubSection {
            channel_capacity: later.hub.channel_capacity.or(earlier.hub.channel_capacity),
            publish_timeout_ms: later
                .hub
                .publish_timeout_ms
                .or(earlier.hub.publish_timeout_ms),
        },
        logging: LoggingSection {
            level: later.logging.level.or(earlier.logging.level),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[test]
    fn test_config_loader_new() {
        let loader = ConfigLoader::new(Path::new("."));
        assert!(!loader.search_paths.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let config_file = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &config_file,
            r#"
            [engine]
            max_concurrent = 8
            success_rate = 1.0
            "#,
        )
        .unwrap();

        let file = load_config_from_file(&config_file).unwrap();
        assert_eq!(file.engine.max_concurrent, Some(8));
        assert_eq!(file.engine.success_rate, Some(1.0));
        assert_eq!(file.hub.channel_capacity, None);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let config_file = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_file, "engine = [").unwrap();

        let err = load_config_from_file(&config_file).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_merge_configs() {
        let earlier = ConfigFile {
            engine: EngineSection {
                max_concurrent: Some(2),
                work_delay_ms: Some(100),
                ..Default::default()
            },
            ..Default::default()
        };
        let later = ConfigFile {
            engine: EngineSection {
                work_delay_ms: Some(10),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = merge_configs(earlier, later);
        assert_eq!(merged.engine.max_concurrent, Some(2));
        assert_eq!(merged.engine.work_delay_ms, Some(10));
    }

    #[test]
    fn test_loader_load_all() {
        let dir = tempdir().unwrap();
        let user = dir.path().join("user.toml");
        let project = dir.path().join("project.toml");
        fs::write(&user, "[hub]\nchannel_capacity = 3\n").unwrap();
        fs::write(&project, "[hub]\nchannel_capacity = 5\n[logging]\nlevel = \"debug\"\n")
            .unwrap();

        let config = ConfigLoader::with_paths(vec![user, project])
            .load_all()
            .unwrap();
        assert_eq!(config.hub.channel_capacity, 5);
        assert_eq!(config.logging.level, "debug");
    }

    /// Collects formatted log lines
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_broken_layer_is_skipped() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "not toml at all [").unwrap();

        let logs = LogBuffer::default();
        let subscriber = {
            let logs = logs.clone();
            tracing_subscriber::fmt()
                .with_writer(move || logs.clone())
                .with_ansi(false)
                .finish()
        };

        let config = tracing::subscriber::with_default(subscriber, || {
            ConfigLoader::with_paths(vec![broken.clone()]).load_all()
        })
        .unwrap();
        assert_eq!(config, TaskflowConfig::default());

        let output = logs.contents();
        assert!(output.contains("WARN"), "no warning logged: {output}");
        assert!(output.contains(&broken.display().to_string()));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        let result = ConfigLoader::with_paths(vec![])
            .with_explicit(dir.path().join("missing.toml"))
            .load_all();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[engine]\nsuccess_rate = 2.0\n").unwrap();

        let result = ConfigLoader::with_paths(vec![]).with_explicit(&path).load_all();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_existing_files() {
        let dir = tempdir().unwrap();
        let taskflow_dir = dir.path().join(CONFIG_DIR_NAME);
        fs::create_dir_all(&taskflow_dir).unwrap();
        let config_file = taskflow_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_file, "").unwrap();

        let loader = ConfigLoader::new(dir.path());
        assert!(loader.existing_files().contains(&config_file));
    }
}
