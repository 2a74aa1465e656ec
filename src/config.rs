//! Sync tunables and the file/env-backed client configuration.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for the coordinator, dispatcher, and runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Periodic pass interval while online.
    pub sync_interval_ms: u64,
    /// Upper bound on a single remote write.
    pub request_timeout_ms: u64,
    /// Rejections after which a record is abandoned; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Drop retired records at the end of each pass.
    pub purge_retired_after_pass: bool,
    /// Health probe interval used when no platform signal is available.
    pub probe_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: 30_000,
            request_timeout_ms: 10_000,
            max_attempts: Some(10),
            purge_retired_after_pass: true,
            probe_interval_ms: 15_000,
        }
    }
}

impl SyncConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms.max(1))
    }
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Client configuration, resolved as env > file > defaults.
#[derive(Debug, Clone, Serialize)]
pub struct ClientConfig {
    /// SQLite queue location.
    pub database_path: ConfigValue<PathBuf>,
    /// Base URL of the workout service, if configured.
    pub server_url: Option<ConfigValue<String>>,
    /// Bearer token for the workout service.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Config file used, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    server_url: Option<String>,
    api_token: Option<String>,
    sync: Option<SyncConfig>,
}

impl ClientConfig {
    /// Loads from `config_path` (or the default path) and the process environment.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::load`], with an injectable environment lookup.
    pub fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut database_path = ConfigValue::new(
            Self::default_data_dir().join("queue.db"),
            ConfigSource::Default,
        );
        let mut server_url = None;
        let mut api_token = None;
        let mut config_file = None;
        let mut sync = SyncConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
            let file: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;

            if let Some(db_path) = file.database_path {
                database_path = ConfigValue::new(resolve_relative(&path, db_path), ConfigSource::File);
            }
            if let Some(url) = file.server_url {
                server_url = Some(ConfigValue::new(url, ConfigSource::File));
            }
            api_token = file.api_token;
            if let Some(file_sync) = file.sync {
                sync = file_sync;
            }
            config_file = Some(path);
        }

        if let Some(db_path) = env("LIFTSYNC_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some(url) = env("LIFTSYNC_SERVER_URL") {
            server_url = Some(ConfigValue::new(url, ConfigSource::Environment));
        }
        if let Some(token) = env("LIFTSYNC_API_TOKEN") {
            api_token = Some(token);
        }

        Ok(Self {
            database_path,
            server_url,
            api_token,
            config_file,
            sync,
        })
    }

    /// Platform config directory, e.g. `~/.config/liftsync/` on Linux.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftsync")
    }

    /// Platform data directory, e.g. `~/.local/share/liftsync/` on Linux.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftsync")
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn resolve_relative(config_path: &Path, db_path: PathBuf) -> PathBuf {
    if db_path.is_relative() {
        config_path
            .parent()
            .map(|dir| dir.join(&db_path))
            .unwrap_or(db_path)
    } else {
        db_path
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}
