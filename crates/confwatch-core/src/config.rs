//! Configuration management.
//!
//! Configuration is a YAML file, by default `~/.config/confwatch/config.yml`:
//!
//! ```yaml
//! watch:
//!   - ~/.bashrc
//!   - /etc/hosts
//! storage:
//!   path: ~/.local/share/confwatch
//! server:
//!   host: 127.0.0.1
//!   port: 8080
//! watcher:
//!   enabled: true
//!   debounce_ms: 2000
//! log_level: info
//! ```
//!
//! A file containing only a YAML list is read as the `watch` list.

use crate::error::{ConfigError, ConfigResult};
use confwatch_util::{path, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CONFWATCH_CONFIG";

/// Environment variable overriding the storage directory.
pub const DATA_DIR_ENV: &str = "CONFWATCH_DATA_DIR";

/// Environment variable overriding `log_level`.
pub const LOG_LEVEL_ENV: &str = "CONFWATCH_LOG_LEVEL";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Paths to watch, as written by the user (`~` allowed).
    pub watch: Vec<String>,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub watcher: WatcherConfig,
    pub log_level: LogLevel,
}

/// Where snapshots are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage directory; the platform data directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// File watcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub enabled: bool,
    /// Quiet period after the last change before a snapshot is taken.
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 2000,
        }
    }
}

impl WatcherConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Lookup order for the file: `explicit`, then `$CONFWATCH_CONFIG`, then
    /// the default location. A missing default file yields the default
    /// configuration; a missing explicitly named file is an error.
    /// `$CONFWATCH_DATA_DIR` and `$CONFWATCH_LOG_LEVEL` are applied last.
    ///
    /// Returns the configuration and the file it was read from, if any.
    pub async fn load(explicit: Option<&Path>) -> ConfigResult<(Self, Option<PathBuf>)> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let (mut config, source) = match named {
            Some(path) => (Self::load_file(&path).await?, Some(path)),
            None => match path::default_config_file() {
                Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                    (Self::load_file(&path).await?, Some(path))
                }
                _ => (Self::default(), None),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        debug!(source = ?source, watched = config.watch.len(), "Loaded configuration");
        Ok((config, source))
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::Read {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;
        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// Parse YAML content. `origin` is only used in error messages.
    pub fn parse_yaml(content: &str, origin: &str) -> ConfigResult<Self> {
        let invalid = |e: serde_yaml::Error| ConfigError::InvalidYaml {
            path: origin.to_string(),
            message: e.to_string(),
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(invalid)?;
        match value {
            serde_yaml::Value::Null => Ok(Self::default()),
            serde_yaml::Value::Sequence(_) => Ok(Self {
                watch: serde_yaml::from_value(value).map_err(invalid)?,
                ..Self::default()
            }),
            other => serde_yaml::from_value(other).map_err(invalid),
        }
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            self.storage.path = Some(dir);
        }
        if let Some(raw) = lookup(LOG_LEVEL_ENV) {
            match LogLevel::parse(&raw) {
                Some(level) => self.log_level = level,
                None => debug!(value = %raw, "Ignoring unknown log level"),
            }
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(entry) = self.watch.iter().find(|w| w.trim().is_empty()) {
            return Err(ConfigError::Validation {
                message: format!("empty watch entry: {:?}", entry),
            });
        }
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "server.host must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Resolved storage directory.
    pub fn storage_dir(&self) -> ConfigResult<PathBuf> {
        match &self.storage.path {
            Some(p) => Ok(path::resolve_user_path(p)),
            None => path::data_dir().ok_or_else(|| {
                ConfigError::InvalidPath("could not determine data directory".to_string())
            }),
        }
    }
}
