//! Persistence configuration via `kapokmq.toml`
//!
//! The broker resolves its persistence settings once at startup from this
//! file. Only `persistence_level = 2` turns the WAL on; every other value
//! leaves it off.

use kapokmq_durability::{
    PersistenceGate, SyncPolicy, WalWriterConfig, DEFAULT_MAX_CONSECUTIVE_FAILURES,
    DEFAULT_WAL_PATH,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name placed in the broker's working directory.
pub const CONFIG_FILE_NAME: &str = "kapokmq.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be written.
    #[error("failed to write config file '{}': {source}", .path.display())]
    Write {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Unknown sync policy name.
    #[error("invalid sync policy '{0}', expected \"never\", \"always\" or \"batched\"")]
    InvalidSyncPolicy(String),

    /// A field holds a value outside its valid range.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Persistence configuration loaded from `kapokmq.toml`.
///
/// # Example
///
/// ```toml
/// # 2 = durable (WAL on), anything else = WAL off
/// persistence_level = 2
/// wal_path = "WAL.log"
/// # "never" | "always" | "batched"
/// sync = "always"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Persistence level. Only `2` enables the WAL.
    #[serde(default)]
    pub persistence_level: i64,
    /// WAL file location, relative to the working directory.
    #[serde(default = "default_wal_path")]
    pub wal_path: PathBuf,
    /// Sync policy name: `"never"`, `"always"` or `"batched"`.
    #[serde(default = "default_sync")]
    pub sync: String,
    /// Maximum milliseconds between fsyncs for `"batched"`.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
    /// Maximum records between fsyncs for `"batched"`.
    #[serde(default = "default_sync_batch_size")]
    pub sync_batch_size: usize,
    /// Consecutive write failures before the WAL writer gives up.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: usize,
}

fn default_wal_path() -> PathBuf {
    PathBuf::from(DEFAULT_WAL_PATH)
}

fn default_sync() -> String {
    "always".to_string()
}

fn default_sync_interval_ms() -> u64 {
    100
}

fn default_sync_batch_size() -> usize {
    1000
}

fn default_max_consecutive_failures() -> usize {
    DEFAULT_MAX_CONSECUTIVE_FAILURES
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            persistence_level: 0,
            wal_path: default_wal_path(),
            sync: default_sync(),
            sync_interval_ms: default_sync_interval_ms(),
            sync_batch_size: default_sync_batch_size(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

impl PersistenceConfig {
    /// Durable configuration writing to `wal_path`.
    pub fn durable(wal_path: impl Into<PathBuf>) -> Self {
        Self {
            persistence_level: 2,
            wal_path: wal_path.into(),
            ..Self::default()
        }
    }

    /// Set sync policy name (builder pattern).
    pub fn with_sync(mut self, sync: impl Into<String>) -> Self {
        self.sync = sync.into();
        self
    }

    /// Resolve the persistence gate.
    pub fn gate(&self) -> PersistenceGate {
        PersistenceGate::new(self.persistence_level)
    }

    /// Parse the sync settings into a [`SyncPolicy`].
    ///
    /// # Errors
    ///
    /// Returns an error for unknown policy names, or a `"batched"` policy
    /// with a zero interval or batch size.
    pub fn sync_policy(&self) -> Result<SyncPolicy, ConfigError> {
        match self.sync.as_str() {
            "never" => Ok(SyncPolicy::Never),
            "always" => Ok(SyncPolicy::Always),
            "batched" => {
                if self.sync_interval_ms == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: "sync_interval_ms",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                if self.sync_batch_size == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: "sync_batch_size",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Ok(SyncPolicy::Batched {
                    interval_ms: self.sync_interval_ms,
                    batch_size: self.sync_batch_size,
                })
            }
            other => Err(ConfigError::InvalidSyncPolicy(other.to_string())),
        }
    }

    /// Build the WAL writer configuration.
    pub fn writer_config(&self) -> Result<WalWriterConfig, ConfigError> {
        if self.max_consecutive_failures == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_consecutive_failures",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(WalWriterConfig::new()
            .with_sync_policy(self.sync_policy()?)
            .with_max_consecutive_failures(self.max_consecutive_failures))
    }

    /// Validate every field eagerly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.writer_config().map(|_| ())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# KapokMQ persistence configuration
#
# Persistence level: 2 = durable (every accepted message is appended to the
# WAL), 0/1 or anything else = no WAL.
persistence_level = 0

# WAL file, relative to the broker's working directory.
wal_path = "WAL.log"

# When WAL records are fsynced:
#   "never"   = left to the OS (fastest, may lose buffered records on crash)
#   "always"  = fsync every record (zero data loss)
#   "batched" = fsync every sync_batch_size records or sync_interval_ms
sync = "always"
sync_interval_ms = 100
sync_batch_size = 1000

# Consecutive WAL write failures before durability is declared lost.
max_consecutive_failures = 3
"#
    }

    /// Parse config from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PersistenceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
