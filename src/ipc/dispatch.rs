//! Top-level IPC dispatch — resolves the target object, then delegates to
//! the configuration handler.

use crate::bus::CONFIG_INTERFACE;
use crate::ipc::handlers;
use crate::registry::ObjectRegistry;
use crate::types::{Error, IpcConfig, Result};
use serde_json::Value;
use tokio::sync::mpsc;

/// Decoded request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: String,
    pub path: String,
    pub interface: Option<String>,
    pub method: String,
    pub body: Value,
}

impl Request {
    /// Read the envelope fields. Missing fields default to empty so the
    /// dispatcher, not the decoder, decides what is an error.
    pub fn from_json(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        Self {
            id: text("id"),
            path: text("path"),
            interface: value
                .get("interface")
                .and_then(|v| v.as_str())
                .map(String::from),
            method: text("method"),
            body: value
                .get("body")
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut request = serde_json::json!({
            "id": self.id,
            "path": self.path,
            "method": self.method,
            "body": self.body,
        });
        if let (Some(interface), Some(map)) = (&self.interface, request.as_object_mut()) {
            map.insert("interface".to_string(), Value::from(interface.as_str()));
        }
        request
    }
}

/// Result from dispatching a request.
#[allow(missing_debug_implementations)]
pub enum DispatchResponse {
    /// Single response value.
    Single(Value),
    /// Subscription — server writes `ack` as a response, then each value as
    /// MSG_SIGNAL, then MSG_STREAM_END when the receiver closes.
    Stream { ack: Value, rx: mpsc::Receiver<Value> },
}

/// Route a request to the object it addresses.
///
/// The path is resolved before anything else, so a request for an
/// unregistered object fails with `ObjectNotFound` without touching any
/// record.
pub async fn dispatch(
    registry: &ObjectRegistry,
    request: &Request,
    ipc_config: &IpcConfig,
) -> Result<DispatchResponse> {
    let (path, object) = registry.resolve(&request.path)?;

    if let Some(interface) = request.interface.as_deref() {
        if interface != CONFIG_INTERFACE {
            return Err(Error::unknown_method(format!(
                "interface {} is not implemented by {}",
                interface, request.path
            )));
        }
    }

    handlers::configuration::handle(
        registry,
        path,
        object,
        &request.method,
        &request.body,
        ipc_config,
    )
    .await
}

// =============================================================================
// Shared helpers
// =============================================================================

pub fn str_field(body: &Value, key: &str) -> Result<String> {
    body.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::validation(format!("Missing required field: {}", key)))
}
