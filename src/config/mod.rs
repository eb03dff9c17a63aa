//! Configuration module for pipeline-services
//!
//! This module handles service configuration including:
//! - Resource directories consulted when components are created
//! - The bound on concurrently attached sources
//! - Logging and dot-dump locations
//! - Stream muxer defaults applied to new pipelines
//!
//! # Data Location
//!
//! Defaults live under the platform-appropriate data directory:
//! - **Linux**: `~/.local/share/pipeline-services/`
//! - **macOS**: `~/Library/Application Support/pipeline-services/`
//! - **Windows**: `%APPDATA%\pipeline-services\`
//!
//! # Files
//!
//! - `services.toml` - Service configuration (overridable with
//!   the `PIPELINE_SERVICES_CONFIG` environment variable)
//! - Pipeline manifests (`.toml` or `.json`) - see [`manifest`]
//!
//! # Example
//!
//! ```ignore
//! use pipeline_services::config::ServiceConfig;
//!
//! let mut config = ServiceConfig::load_or_default();
//! config.max_sources_in_use = 4;
//! config.save("services.toml")?;
//! ```

pub mod manifest;
pub mod settings;

pub use manifest::{ComponentSpec, PipelineManifest, PipelineSpec};
pub use settings::*;

use crate::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "pipeline-services";

/// Service configuration filename
pub const CONFIG_FILE: &str = "services.toml";

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV_VAR: &str = "PIPELINE_SERVICES_CONFIG";

/// Default bound on sources attached to pipelines at the same time
pub const DEFAULT_MAX_SOURCES_IN_USE: u32 = 8;

/// Default tracing filter directive
pub const DEFAULT_LOG_FILTER: &str = "info";

// ==================== Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the service configuration file
///
/// The environment override wins over the platform default.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

fn data_subdir(name: &str) -> PathBuf {
    app_data_dir()
        .unwrap_or_else(|| PathBuf::from(".").join(APP_ID))
        .join(name)
}

// ==================== Service Config ====================

/// Process-wide service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Maximum number of sources attached to pipelines at once
    #[serde(default = "default_max_sources")]
    pub max_sources_in_use: u32,

    /// Directory URI sources resolve their stream file against
    #[serde(default = "default_stream_dir")]
    pub stream_dir: PathBuf,

    /// Directory relative inference config paths resolve against
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Directory relative model engine paths resolve against
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Where pipeline graphs are written by dot dumps (disabled when unset)
    #[serde(default)]
    pub dot_dump_dir: Option<PathBuf>,

    /// Tracing filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Directory for daily rolling log files (console only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Muxer settings applied to every new pipeline
    #[serde(default)]
    pub streammux: StreamMuxSettings,
}

fn default_max_sources() -> u32 {
    DEFAULT_MAX_SOURCES_IN_USE
}

fn default_stream_dir() -> PathBuf {
    data_subdir("streams")
}

fn default_config_dir() -> PathBuf {
    data_subdir("configs")
}

fn default_model_dir() -> PathBuf {
    data_subdir("models")
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_sources_in_use: DEFAULT_MAX_SOURCES_IN_USE,
            stream_dir: default_stream_dir(),
            config_dir: default_config_dir(),
            model_dir: default_model_dir(),
            dot_dump_dir: None,
            log_filter: default_log_filter(),
            log_dir: None,
            streammux: StreamMuxSettings::default(),
        }
    }
}

impl ServiceConfig {
    /// Load a configuration file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ServiceError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        config
            .streammux
            .validate()
            .map_err(|e| ServiceError::Config(format!("Invalid streammux settings: {}", e)))?;

        Ok(config)
    }

    /// Load from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load service config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ServiceError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ServiceError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            ServiceError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Resolve a stream file name against the stream directory
    pub fn stream_path(&self, uri: &str) -> PathBuf {
        self.stream_dir.join(uri)
    }

    /// Resolve an inference config path; absolute paths are kept as given
    pub fn infer_config_path(&self, file: &str) -> PathBuf {
        resolve(&self.config_dir, file)
    }

    /// Resolve a model engine path; absolute paths are kept as given
    pub fn model_engine_path(&self, file: &str) -> PathBuf {
        resolve(&self.model_dir, file)
    }
}

fn resolve(dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_sources_in_use, DEFAULT_MAX_SOURCES_IN_USE);
        assert_eq!(config.log_filter, "info");
        assert!(config.dot_dump_dir.is_none());
        assert!(config.stream_dir.ends_with("streams"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = ServiceConfig::default();
        config.max_sources_in_use = 3;
        config.stream_dir = PathBuf::from("/srv/streams");
        config.dot_dump_dir = Some(PathBuf::from("/tmp/dots"));
        config.save(&path).unwrap();

        let loaded = ServiceConfig::load(&path).unwrap();
        assert_eq!(loaded.max_sources_in_use, 3);
        assert_eq!(loaded.stream_dir, PathBuf::from("/srv/streams"));
        assert_eq!(loaded.dot_dump_dir, Some(PathBuf::from("/tmp/dots")));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "max_sources_in_use = 2\n").unwrap();

        let loaded = ServiceConfig::load(&path).unwrap();
        assert_eq!(loaded.max_sources_in_use, 2);
        assert_eq!(loaded.streammux, StreamMuxSettings::default());
    }

    #[test]
    fn test_invalid_streammux_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[streammux]\nbatch_size = 0\n").unwrap();

        let err = ServiceConfig::load(&path).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn test_path_resolution() {
        let mut config = ServiceConfig::default();
        config.config_dir = PathBuf::from("/etc/infer");
        config.model_dir = PathBuf::from("/var/models");

        assert_eq!(
            config.infer_config_path("pgie.txt"),
            PathBuf::from("/etc/infer/pgie.txt")
        );
        assert_eq!(
            config.model_engine_path("/abs/model.engine"),
            PathBuf::from("/abs/model.engine")
        );
    }
}
