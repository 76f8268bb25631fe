//! Applies incoming `configurationChanged` signals to the client cache.

use crate::client::cache::ClientCache;
use crate::ipc::SignalStream;
use crate::types::{Error, Result};
use std::sync::Arc;

/// Feed every signal from `stream` into `cache` until the stream fails.
///
/// The server ending the stream is a transport error too: the client has no
/// way to stay in sync without it.
pub async fn listen(mut stream: SignalStream, cache: Arc<ClientCache>) -> Result<()> {
    tracing::info!("Listening for configuration changes as {}", stream.subscriber_id());
    loop {
        match stream.next_signal().await? {
            Some(signal) => {
                tracing::debug!("configurationChanged from {} at {}", signal.path, signal.timestamp_ms);
                cache.apply_update(&signal.record).await;
            }
            None => return Err(Error::transport("signal stream closed by server")),
        }
    }
}
