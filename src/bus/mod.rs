//! Signal bus for configuration change broadcasts.
//!
//! Configuration objects publish `configurationChanged` signals here, and
//! every subscriber registered for the object's path receives a copy. The
//! IPC layer bridges subscriptions onto network streams.
//!
//! Delivery is fire-and-forget over unbounded channels, so publishing never
//! waits on a slow subscriber.

use crate::types::{ObjectPath, Result};
use crate::value::ConfigRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Interface every configuration object implements.
pub const CONFIG_INTERFACE: &str = "com.system.configurationManager.Application.Configuration";

/// Member name of the change broadcast.
pub const CONFIGURATION_CHANGED: &str = "configurationChanged";

// =============================================================================
// Message Types
// =============================================================================

/// A broadcast carrying a full record snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub path: ObjectPath,
    pub interface: String,
    pub member: String,
    pub record: ConfigRecord,
    pub timestamp_ms: i64,
}

impl Signal {
    /// Build a `configurationChanged` signal stamped with the current time.
    pub fn configuration_changed(path: ObjectPath, record: ConfigRecord) -> Self {
        Self {
            path,
            interface: CONFIG_INTERFACE.to_string(),
            member: CONFIGURATION_CHANGED.to_string(),
            record,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

// =============================================================================
// Subscriber Management
// =============================================================================

#[derive(Debug)]
struct Subscriber {
    id: String,
    tx: mpsc::UnboundedSender<Signal>,
}

/// Subscription receipt for managing subscriptions.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub paths: Vec<ObjectPath>,
}

/// Statistics about bus usage.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BusStats {
    pub signals_published: u64,
    pub signals_delivered: u64,
    pub active_subscribers: usize,
}

// =============================================================================
// SignalBus
// =============================================================================

/// In-memory fan-out of signals keyed by object path.
#[derive(Debug)]
pub struct SignalBus {
    /// path -> subscribers listening on that path
    subscribers: Arc<RwLock<HashMap<ObjectPath, Vec<Subscriber>>>>,

    stats: Arc<RwLock<BusStats>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(BusStats::default())),
        }
    }

    /// Publish a signal to every subscriber of its path.
    ///
    /// Returns how many subscribers it reached. Subscribers whose receivers
    /// have been dropped are pruned.
    pub async fn publish(&self, signal: Signal) -> Result<usize> {
        let mut delivered = 0;
        let mut saw_closed = false;
        {
            let subscribers = self.subscribers.read().await;
            let interested = subscribers
                .get(&signal.path)
                .map(|subs| subs.as_slice())
                .unwrap_or(&[]);

            for subscriber in interested {
                if subscriber.tx.send(signal.clone()).is_ok() {
                    delivered += 1;
                } else {
                    saw_closed = true;
                }
            }
        }

        if saw_closed {
            self.prune(&signal.path).await;
        }

        let mut stats = self.stats.write().await;
        stats.signals_published += 1;
        stats.signals_delivered += delivered as u64;

        tracing::debug!(
            "Published {} on {} to {} subscribers",
            signal.member,
            signal.path,
            delivered
        );

        Ok(delivered)
    }

    /// Subscribe to signals on one or more object paths.
    ///
    /// Returns (subscription handle, receiver channel).
    pub async fn subscribe(
        &self,
        subscriber_id: String,
        paths: Vec<ObjectPath>,
    ) -> Result<(Subscription, mpsc::UnboundedReceiver<Signal>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut subscribers = self.subscribers.write().await;
        for path in &paths {
            subscribers.entry(path.clone()).or_default().push(Subscriber {
                id: subscriber_id.clone(),
                tx: tx.clone(),
            });
        }

        let mut stats = self.stats.write().await;
        stats.active_subscribers = subscribers.values().map(Vec::len).sum();

        tracing::debug!("Subscriber {} registered for paths: {:?}", subscriber_id, paths);

        Ok((
            Subscription {
                id: subscriber_id,
                paths,
            },
            rx,
        ))
    }

    /// Remove a subscription from every path it was registered on.
    pub async fn unsubscribe(&self, subscription: &Subscription) -> Result<()> {
        let mut subscribers = self.subscribers.write().await;

        for path in &subscription.paths {
            if let Some(subs) = subscribers.get_mut(path) {
                subs.retain(|s| s.id != subscription.id);
                if subs.is_empty() {
                    subscribers.remove(path);
                }
            }
        }

        let mut stats = self.stats.write().await;
        stats.active_subscribers = subscribers.values().map(Vec::len).sum();

        tracing::debug!("Unsubscribed: {}", subscription.id);

        Ok(())
    }

    async fn prune(&self, path: &ObjectPath) {
        let mut subscribers = self.subscribers.write().await;
        if let Some(subs) = subscribers.get_mut(path) {
            let before = subs.len();
            subs.retain(|s| !s.tx.is_closed());
            tracing::debug!("Pruned {} closed subscribers on {}", before - subs.len(), path);
            if subs.is_empty() {
                subscribers.remove(path);
            }
        }

        let mut stats = self.stats.write().await;
        stats.active_subscribers = subscribers.values().map(Vec::len).sum();
    }

    /// Get current bus statistics.
    pub async fn get_stats(&self) -> BusStats {
        self.stats.read().await.clone()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
