//! IPC client — typed calls against a confsync server and signal streams.

use crate::bus::{CONFIGURATION_CHANGED, CONFIG_INTERFACE};
use crate::ipc::codec::{
    decode_msgpack, encode_msgpack, read_frame, write_frame, MSG_ERROR, MSG_REQUEST, MSG_RESPONSE,
    MSG_SIGNAL, MSG_STREAM_END,
};
use crate::ipc::dispatch::Request;
use crate::ipc::handlers::configuration::{CHANGE_CONFIGURATION, GET_CONFIGURATION, SUBSCRIBE};
use crate::types::{Error, Result};
use crate::value::{ConfigRecord, Value};
use serde_json::Value as Json;
use tokio::net::{TcpStream, ToSocketAddrs};

const DEFAULT_MAX_FRAME_BYTES: u32 = 5 * 1024 * 1024;

/// Connection to a confsync server for request/response calls.
#[derive(Debug)]
pub struct IpcClient {
    stream: TcpStream,
    max_frame_bytes: u32,
    next_id: u64,
}

impl IpcClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::transport(format!("connect failed: {}", e)))?;
        Ok(Self {
            stream,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            next_id: 1,
        })
    }

    /// Send one request and wait for its reply body.
    pub async fn call(&mut self, path: &str, method: &str, body: Json) -> Result<Json> {
        let request = Request {
            id: self.next_id.to_string(),
            path: path.to_string(),
            interface: Some(CONFIG_INTERFACE.to_string()),
            method: method.to_string(),
            body,
        };
        self.next_id += 1;

        let payload = encode_msgpack(&request.to_json())?;
        write_frame(&mut self.stream, MSG_REQUEST, &payload)
            .await
            .map_err(|e| Error::transport(format!("send failed: {}", e)))?;

        let (msg_type, reply) = self.read_reply().await?;
        match msg_type {
            MSG_RESPONSE => Ok(reply.get("body").cloned().unwrap_or(Json::Null)),
            MSG_ERROR => Err(remote_error(&reply)),
            other => Err(Error::transport(format!(
                "unexpected reply frame type 0x{:02X}",
                other
            ))),
        }
    }

    pub async fn get_configuration(&mut self, path: &str) -> Result<ConfigRecord> {
        let body = self.call(path, GET_CONFIGURATION, serde_json::json!({})).await?;
        let (record, _) = ConfigRecord::from_json_lossy(&body)
            .map_err(|e| Error::transport(format!("malformed record from server: {}", e)))?;
        Ok(record)
    }

    pub async fn change_configuration(&mut self, path: &str, key: &str, value: &Value) -> Result<()> {
        self.call(
            path,
            CHANGE_CONFIGURATION,
            serde_json::json!({ "key": key, "value": value.to_json() }),
        )
        .await?;
        Ok(())
    }

    /// Turn this connection into a signal stream for `path`.
    ///
    /// Returns once the server has registered the subscription, so no signal
    /// emitted after this call is missed.
    pub async fn subscribe(mut self, path: &str) -> Result<SignalStream> {
        let ack = self.call(path, SUBSCRIBE, serde_json::json!({})).await?;
        let subscriber_id = ack
            .get("subscriber_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        tracing::debug!("Subscribed to {} as {}", path, subscriber_id);

        Ok(SignalStream {
            stream: self.stream,
            max_frame_bytes: self.max_frame_bytes,
            subscriber_id,
        })
    }

    async fn read_reply(&mut self) -> Result<(u8, Json)> {
        read_message(&mut self.stream, self.max_frame_bytes)
            .await?
            .ok_or_else(|| Error::transport("connection closed by server"))
    }
}

/// A `configurationChanged` signal as seen by a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedSignal {
    pub path: String,
    pub member: String,
    pub record: ConfigRecord,
    pub timestamp_ms: i64,
}

/// Server-to-client stream of signals for one subscription.
#[derive(Debug)]
pub struct SignalStream {
    stream: TcpStream,
    max_frame_bytes: u32,
    subscriber_id: String,
}

impl SignalStream {
    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Wait for the next signal. `Ok(None)` means the server ended the
    /// stream.
    ///
    /// Record entries that are not scalars are dropped, so one odd field
    /// never spoils the rest of the update.
    pub async fn next_signal(&mut self) -> Result<Option<ReceivedSignal>> {
        loop {
            let Some((msg_type, frame)) =
                read_message(&mut self.stream, self.max_frame_bytes).await?
            else {
                return Ok(None);
            };

            match msg_type {
                MSG_SIGNAL => {
                    let body = frame.get("body").cloned().unwrap_or(Json::Null);
                    let member = body
                        .get("member")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    if member != CONFIGURATION_CHANGED {
                        tracing::debug!("Ignoring signal {:?}", member);
                        continue;
                    }
                    let record = match body.get("record") {
                        Some(raw) => ConfigRecord::from_json_lossy(raw)
                            .map(|(record, _)| record)
                            .map_err(|e| Error::transport(format!("malformed signal: {}", e)))?,
                        None => return Err(Error::transport("signal without record")),
                    };
                    return Ok(Some(ReceivedSignal {
                        path: body
                            .get("path")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        member,
                        record,
                        timestamp_ms: body
                            .get("timestamp_ms")
                            .and_then(|v| v.as_i64())
                            .unwrap_or_default(),
                    }));
                }
                MSG_STREAM_END => return Ok(None),
                MSG_ERROR => return Err(remote_error(&frame)),
                other => {
                    return Err(Error::transport(format!(
                        "unexpected frame type 0x{:02X} on signal stream",
                        other
                    )))
                }
            }
        }
    }
}

async fn read_message(stream: &mut TcpStream, max_frame_bytes: u32) -> Result<Option<(u8, Json)>> {
    let frame = read_frame(stream, max_frame_bytes)
        .await
        .map_err(|e| Error::transport(format!("receive failed: {}", e)))?;
    match frame {
        Some((msg_type, payload)) => {
            let value = decode_msgpack(&payload).map_err(|e| Error::transport(e.to_string()))?;
            Ok(Some((msg_type, value)))
        }
        None => Ok(None),
    }
}

fn remote_error(reply: &Json) -> Error {
    let error = reply.get("error");
    let field = |key: &str| {
        error
            .and_then(|e| e.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    };
    Error::from_ipc(field("code"), field("message"))
}
