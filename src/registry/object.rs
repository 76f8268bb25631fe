//! Server-side configuration object bound to one application.

use crate::bus::{Signal, SignalBus};
use crate::registry::store::ConfigStore;
use crate::types::{Error, ObjectPath, Result};
use crate::value::{ConfigRecord, Value};
use std::sync::Arc;

/// One application's configuration record plus the means to broadcast it.
///
/// Mutation and broadcast are separate calls so a caller can batch several
/// changes under one broadcast. Callers sharing an object must serialize the
/// pair themselves (the registry wraps each object in a mutex for this).
#[derive(Debug)]
pub struct ConfigObject {
    path: ObjectPath,
    record: ConfigRecord,
    bus: Arc<SignalBus>,
    store: Arc<dyn ConfigStore>,
}

impl ConfigObject {
    pub fn new(
        path: ObjectPath,
        record: ConfigRecord,
        bus: Arc<SignalBus>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        Self {
            path,
            record,
            bus,
            store,
        }
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Snapshot of the full current record.
    pub fn get_configuration(&self) -> ConfigRecord {
        self.record.clone()
    }

    /// Replace the value bound to an existing key, then run the persistence
    /// hook. Unknown keys fail with `KeyNotFound` and change nothing. If the
    /// hook fails the previous value is restored.
    pub async fn change_configuration(&mut self, key: &str, value: Value) -> Result<()> {
        let previous = self.record.replace(key, value)?;

        if let Err(e) = self.store.update(&self.path, &self.record).await {
            self.record.replace(key, previous)?;
            return Err(Error::internal(format!(
                "persisting {} failed: {}",
                self.path, e
            )));
        }

        tracing::info!(
            "{}: {} changed from {} to {}",
            self.path,
            key,
            previous,
            self.record.get(key).map(ToString::to_string).unwrap_or_default()
        );
        Ok(())
    }

    /// Broadcast the entire current record to subscribers of this path.
    pub async fn emit_configuration_changed(&self) -> Result<usize> {
        let signal = Signal::configuration_changed(self.path.clone(), self.record.clone());
        let delivered = self.bus.publish(signal).await?;
        tracing::info!(
            "Emitted configuration changed signal for {} ({} subscribers)",
            self.path,
            delivered
        );
        Ok(delivered)
    }
}
