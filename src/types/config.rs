//! Configuration structures.
//!
//! Settings come from an optional JSON file, then command-line flags and
//! environment variables override individual fields.

use crate::types::ids::DEFAULT_OBJECT_PATH_PREFIX;
use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name (under `$HOME`) holding per-application records.
pub const DEFAULT_CONFIG_DIR_NAME: &str = "com.system.configurationManager";

/// Default configuration directory: `$HOME/com.system.configurationManager`.
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_CONFIG_DIR_NAME)
}

/// Global service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// IPC transport configuration.
    #[serde(default)]
    pub ipc: IpcConfig,
}

impl Config {
    /// Load settings from a JSON file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_unreadable(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::config_parse(format!("{}: {}", path.display(), e)))
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IPC server bind address (TCP).
    pub listen_addr: String,

    /// Directory scanned for per-application JSON records.
    pub config_dir: PathBuf,

    /// Prefix for every configuration object path.
    pub object_path_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:50051".to_string(),
            config_dir: default_config_dir(),
            object_path_prefix: DEFAULT_OBJECT_PATH_PREFIX.to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error), used when
    /// `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// IPC transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Maximum frame payload size in bytes.
    pub max_frame_bytes: u32,

    /// Bounded channel capacity for signal streams (Subscribe).
    pub stream_channel_capacity: usize,

    /// Maximum concurrent TCP connections. Connections beyond this limit
    /// are refused.
    pub max_connections: usize,

    /// Idle time allowed between request frames before a connection is
    /// dropped. Does not apply while a connection is streaming signals.
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Slow consumers that cannot accept a frame within this window are
    /// dropped.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 5 * 1024 * 1024,
            stream_channel_capacity: 64,
            max_connections: 1000,
            read_timeout: Duration::from_secs(300),
            write_timeout: Duration::from_secs(10),
        }
    }
}
