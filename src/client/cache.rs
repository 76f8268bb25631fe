//! Client-side mirror of the two settings the worker uses.
//!
//! One mutex guards both fields; readers copy both under the lock and the
//! notification handler writes both under the lock.

use crate::client::settings::ClientSettings;
use crate::client::{PHRASE_KEY, TIMEOUT_KEY};
use crate::value::{ConfigRecord, Value};
use tokio::sync::Mutex;

/// Copy of the cached fields taken under the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub interval_ms: i64,
    pub phrase: String,
}

/// Which fields an update actually overwrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedUpdate {
    pub interval: bool,
    pub phrase: bool,
}

#[derive(Debug)]
pub struct ClientCache {
    state: Mutex<CacheSnapshot>,
}

impl ClientCache {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            state: Mutex::new(CacheSnapshot {
                interval_ms: settings.interval_ms,
                phrase: settings.phrase,
            }),
        }
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        self.state.lock().await.clone()
    }

    /// Apply a broadcast record field by field.
    ///
    /// `Timeout` is taken only if it is a positive integer and
    /// `TimeoutPhrase` only if it is a string. Anything else leaves that
    /// field as it was.
    pub async fn apply_update(&self, record: &ConfigRecord) -> AppliedUpdate {
        let mut applied = AppliedUpdate::default();
        let mut state = self.state.lock().await;

        match record.get(PHRASE_KEY) {
            Some(Value::String(phrase)) => {
                tracing::info!("Received timeout phrase: {}", phrase);
                state.phrase = phrase.clone();
                applied.phrase = true;
            }
            Some(other) => tracing::warn!("Ignoring {} of type {}", PHRASE_KEY, other.kind()),
            None => {}
        }

        match record.get(TIMEOUT_KEY) {
            Some(Value::Integer(ms)) if *ms > 0 => {
                tracing::info!("Received timeout: {}", ms);
                state.interval_ms = *ms;
                applied.interval = true;
            }
            Some(Value::Integer(ms)) => tracing::warn!("Ignoring non-positive {}: {}", TIMEOUT_KEY, ms),
            Some(other) => tracing::warn!("Ignoring {} of type {}", TIMEOUT_KEY, other.kind()),
            None => {}
        }

        applied
    }
}
