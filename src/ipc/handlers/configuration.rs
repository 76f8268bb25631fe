//! Configuration object handler — ChangeConfiguration, GetConfiguration,
//! Subscribe (streaming).

use crate::ipc::dispatch::{str_field, DispatchResponse};
use crate::registry::{ObjectHandle, ObjectRegistry};
use crate::types::{Error, IpcConfig, ObjectPath, Result};
use crate::value::Value;
use serde_json::Value as Json;
use tokio::sync::mpsc;

pub const CHANGE_CONFIGURATION: &str = "ChangeConfiguration";
pub const GET_CONFIGURATION: &str = "GetConfiguration";
pub const SUBSCRIBE: &str = "Subscribe";

pub async fn handle(
    registry: &ObjectRegistry,
    path: &ObjectPath,
    object: &ObjectHandle,
    method: &str,
    body: &Json,
    ipc_config: &IpcConfig,
) -> Result<DispatchResponse> {
    match method {
        CHANGE_CONFIGURATION => {
            let key = str_field(body, "key")?;
            let raw = body
                .get("value")
                .ok_or_else(|| Error::validation("Missing required field: value"))?;
            let value = Value::from_json(raw).ok_or_else(|| {
                Error::validation(format!(
                    "value for {} must be an integer, float or string, got {}",
                    key, raw
                ))
            })?;

            // Mutation and broadcast share one critical section so the
            // signal carries exactly the record this change produced.
            let mut guard = object.lock().await;
            tracing::debug!("ChangeConfiguration on {}: {} = {}", path, key, value);
            guard.change_configuration(&key, value).await?;
            guard.emit_configuration_changed().await?;
            drop(guard);

            Ok(DispatchResponse::Single(Json::Object(serde_json::Map::new())))
        }

        GET_CONFIGURATION => {
            let guard = object.lock().await;
            tracing::debug!("GetConfiguration on {}", path);
            let record = guard.get_configuration();
            drop(guard);

            Ok(DispatchResponse::Single(record.to_json()))
        }

        SUBSCRIBE => {
            let sub_id = body
                .get("subscriber_id")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("ipc-sub-{}", uuid::Uuid::new_v4().simple()));

            let bus = registry.bus().clone();
            let (subscription, signal_rx) = bus.subscribe(sub_id, vec![path.clone()]).await?;
            let ack = serde_json::json!({
                "subscriber_id": subscription.id,
                "path": path,
            });

            // Bridge UnboundedReceiver<Signal> → bounded mpsc::Receiver<Value>.
            // The bridge ends as soon as the consumer drops its receiver, not
            // only when the next signal fails to send.
            let (tx, rx) = mpsc::channel(ipc_config.stream_channel_capacity);
            tokio::spawn(async move {
                let mut signal_rx = signal_rx;
                loop {
                    let signal = tokio::select! {
                        _ = tx.closed() => break, // Consumer disconnected
                        signal = signal_rx.recv() => match signal {
                            Some(signal) => signal,
                            None => break,
                        },
                    };
                    let chunk = match serde_json::to_value(&signal) {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            tracing::warn!("Dropping unencodable signal for {}: {}", signal.path, e);
                            continue;
                        }
                    };
                    if tx.send(chunk).await.is_err() {
                        break;
                    }
                }
                if let Err(e) = bus.unsubscribe(&subscription).await {
                    tracing::warn!("Unsubscribe {} failed: {}", subscription.id, e);
                }
            });

            Ok(DispatchResponse::Stream { ack, rx })
        }

        _ => Err(Error::unknown_method(format!(
            "{} is not a configuration method",
            method
        ))),
    }
}
