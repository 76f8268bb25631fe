//! Persistence hook invoked after every successful mutation.

use crate::types::{ObjectPath, Result};
use crate::value::ConfigRecord;
use async_trait::async_trait;

/// Receives the full record after each accepted change.
#[async_trait]
pub trait ConfigStore: Send + Sync + std::fmt::Debug {
    async fn update(&self, path: &ObjectPath, record: &ConfigRecord) -> Result<()>;
}

/// Store that discards updates. Changes live only in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl ConfigStore for NoopStore {
    async fn update(&self, path: &ObjectPath, _record: &ConfigRecord) -> Result<()> {
        tracing::trace!("Persistence skipped for {}", path);
        Ok(())
    }
}
