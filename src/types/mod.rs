//! Core types for confsync.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Validated identifiers (AppId, ObjectPath)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for server, logging, and transport

mod config;
mod errors;
mod ids;

pub use config::{
    default_config_dir, Config, IpcConfig, ObservabilityConfig, ServerConfig,
    DEFAULT_CONFIG_DIR_NAME,
};
pub use errors::{
    Error, Result, CODE_INTERNAL, CODE_INVALID_ARGUMENT, CODE_KEY_NOT_FOUND,
    CODE_OBJECT_NOT_FOUND, CODE_UNKNOWN_METHOD,
};
pub use ids::{AppId, ObjectPath, DEFAULT_OBJECT_PATH_PREFIX};
