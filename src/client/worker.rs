//! Foreground work loop driven by the cached settings.

use crate::client::cache::{CacheSnapshot, ClientCache};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Reports the cached phrase, then sleeps for the cached interval, forever.
#[derive(Debug)]
pub struct Worker<W> {
    cache: Arc<ClientCache>,
    out: W,
}

impl<W: Write> Worker<W> {
    pub fn new(cache: Arc<ClientCache>, out: W) -> Self {
        Self { cache, out }
    }

    /// One cycle without the sleep: read both fields under the lock, then
    /// report the phrase. Returns how long to sleep.
    pub async fn tick(&mut self) -> Duration {
        let CacheSnapshot { interval_ms, phrase } = self.cache.snapshot().await;

        if let Err(e) = writeln!(self.out, "\"{}\"", phrase).and_then(|()| self.out.flush()) {
            tracing::warn!("Failed to write phrase: {}", e);
        }
        tracing::debug!("Sleeping {}ms", interval_ms);

        Duration::from_millis(u64::try_from(interval_ms).unwrap_or(0))
    }

    /// Run until the process ends. The sleep uses the interval read in the
    /// same cycle, not one changed while sleeping.
    pub async fn run(mut self) {
        loop {
            let pause = self.tick().await;
            tokio::time::sleep(pause).await;
        }
    }
}
