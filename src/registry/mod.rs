//! Object registry: every configuration object the server offers, keyed by
//! object path.
//!
//! The registry is populated once from (application id, record) pairs and is
//! never mutated afterwards, so it is shared as `Arc<ObjectRegistry>` without
//! a lock. Each object carries its own mutex, which is the critical section
//! for mutate-then-broadcast.

mod object;
mod store;

pub use object::ConfigObject;
pub use store::{ConfigStore, NoopStore};

use crate::bus::SignalBus;
use crate::types::{AppId, Error, ObjectPath, Result};
use crate::value::ConfigRecord;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle to one configuration object.
pub type ObjectHandle = Arc<Mutex<ConfigObject>>;

#[derive(Debug)]
pub struct ObjectRegistry {
    objects: HashMap<ObjectPath, ObjectHandle>,
    bus: Arc<SignalBus>,
}

impl ObjectRegistry {
    /// Empty registry bound to a signal bus.
    pub fn new(bus: Arc<SignalBus>) -> Self {
        Self {
            objects: HashMap::new(),
            bus,
        }
    }

    /// Build a registry from discovered applications.
    ///
    /// Each entry becomes one object at `<prefix>/<app_id>`. An entry whose
    /// path is already taken is skipped with a warning; the first one wins.
    pub fn build(
        prefix: &str,
        entries: impl IntoIterator<Item = (AppId, ConfigRecord)>,
        bus: Arc<SignalBus>,
        store: Arc<dyn ConfigStore>,
    ) -> Result<Self> {
        let mut registry = Self::new(bus);
        for (app_id, record) in entries {
            let path = ObjectPath::for_app(prefix, &app_id).map_err(|e| {
                Error::validation(format!("invalid object path prefix {:?}: {}", prefix, e))
            })?;

            let object = ConfigObject::new(
                path.clone(),
                record,
                registry.bus.clone(),
                store.clone(),
            );
            if let Err(e) = registry.register(path, object) {
                tracing::warn!("Skipping application {}: {}", app_id, e);
            }
        }
        Ok(registry)
    }

    /// Insert an object. Fails if the path is already registered.
    pub fn register(&mut self, path: ObjectPath, object: ConfigObject) -> Result<()> {
        if self.objects.contains_key(&path) {
            return Err(Error::validation(format!("object path {} already registered", path)));
        }
        let keys = object.get_configuration().keys().collect::<Vec<_>>().join(", ");
        tracing::info!("Registered on path: {} (keys: {})", path, keys);
        self.objects.insert(path, Arc::new(Mutex::new(object)));
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&ObjectHandle> {
        self.objects.get(path)
    }

    /// Resolve a path to its registered key and object, or fail with
    /// `ObjectNotFound`.
    pub fn resolve(&self, path: &str) -> Result<(&ObjectPath, &ObjectHandle)> {
        self.objects
            .get_key_value(path)
            .ok_or_else(|| Error::object_not_found(path))
    }

    pub fn paths(&self) -> impl Iterator<Item = &ObjectPath> {
        self.objects.keys()
    }

    pub fn bus(&self) -> &Arc<SignalBus> {
        &self.bus
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
