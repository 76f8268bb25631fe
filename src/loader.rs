//! Reads per-application JSON records from disk.
//!
//! Each `<name>.json` in the configuration directory is one application. Its
//! top-level object becomes the application's [`ConfigRecord`], typed by each
//! value's JSON shape.

use crate::bus::SignalBus;
use crate::registry::{ConfigStore, ObjectRegistry};
use crate::types::{AppId, Error, Result, ServerConfig};
use crate::value::ConfigRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read and type one record file.
///
/// Entries that are not scalars are dropped with a warning; the rest of the
/// record is kept.
pub fn load_record(path: &Path) -> Result<ConfigRecord> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config_unreadable(format!("{}: {}", path.display(), e)))?;
    let raw: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| Error::config_parse(format!("{}: {}", path.display(), e)))?;

    let (record, skipped) = ConfigRecord::from_json_lossy(&raw).map_err(|e| match e {
        Error::ConfigParse(msg) => Error::config_parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;
    for key in skipped {
        tracing::warn!(
            "{}: ignoring {:?}, only integer, float and string values are supported",
            path.display(),
            key
        );
    }
    Ok(record)
}

/// Scan a directory for application records.
///
/// Files are visited in name order. Unreadable or malformed files, and files
/// whose stem yields no valid identifier, are skipped with a warning. Only a
/// failure to list the directory itself is an error.
pub fn scan_directory(dir: &Path) -> Result<Vec<(AppId, ConfigRecord)>> {
    let listing = std::fs::read_dir(dir)
        .map_err(|e| Error::config_unreadable(format!("{}: {}", dir.display(), e)))?;

    let mut files: Vec<PathBuf> = listing
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut found = Vec::with_capacity(files.len());
    for path in files {
        tracing::debug!("Examining {}", path.display());

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!("Skipping {}: filename is not valid UTF-8", path.display());
            continue;
        };
        let app_id = match AppId::derive(stem) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        match load_record(&path) {
            Ok(record) => found.push((app_id, record)),
            Err(e) => tracing::warn!("Skipping record: {}", e),
        }
    }

    Ok(found)
}

/// Scan `server.config_dir` and register every application found.
///
/// Returns `None` when no valid record was found, meaning there is nothing
/// to serve.
pub fn load_registry(
    server: &ServerConfig,
    bus: Arc<SignalBus>,
    store: Arc<dyn ConfigStore>,
) -> Result<Option<ObjectRegistry>> {
    let entries = scan_directory(&server.config_dir)?;
    let registry = ObjectRegistry::build(&server.object_path_prefix, entries, bus, store)?;

    tracing::info!(
        "Found {} valid configuration files in {}",
        registry.len(),
        server.config_dir.display()
    );
    if registry.is_empty() {
        return Ok(None);
    }
    Ok(Some(registry))
}
