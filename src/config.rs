//! Server configuration.
//!
//! Loaded from an optional TOML file; every field has a default, so an empty file (or
//! no file at all) yields a runnable server.
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 2025
//! max_connections = 64      # omit for no limit
//! max_frame_bytes = 16777216
//!
//! [storage]
//! data_dir = "data"
//! snapshot_dir = "."
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener and per-connection limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Address to bind (default: "0.0.0.0")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// TCP port (default: 2025)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum concurrent sessions. `None` accepts without limit.
    #[serde(default)]
    pub max_connections: Option<usize>,

    /// Largest accepted frame payload in bytes (default: 16MB)
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    2025
}

fn default_max_frame_bytes() -> usize {
    16 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_connections: None,
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

/// Where tables and snapshots live.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageConfig {
    /// Directory of `<table>.csv` files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Base directory for relative snapshot file names.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

impl StorageConfig {
    /// Resolve a client-supplied snapshot name against `snapshot_dir`.
    pub fn snapshot_path(&self, file_name: &str) -> PathBuf {
        let p = Path::new(file_name);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.snapshot_dir.join(p)
        }
    }
}

/// Log filtering.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_frame_bytes == 0 {
            return Err(Error::Config(
                "server.max_frame_bytes must be greater than 0".into(),
            ));
        }
        if self.server.max_connections == Some(0) {
            return Err(Error::Config(
                "server.max_connections must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }
}
