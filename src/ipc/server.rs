//! TCP IPC server — accept loop and per-connection handler.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::ipc::codec::{
    decode_msgpack, encode_msgpack, read_frame, write_frame, MSG_ERROR, MSG_REQUEST, MSG_RESPONSE,
    MSG_SIGNAL, MSG_STREAM_END,
};
use crate::ipc::dispatch::{self, DispatchResponse, Request};
use crate::registry::ObjectRegistry;
use crate::types::{IpcConfig, CODE_INVALID_ARGUMENT};

/// IPC server exposing the object registry.
#[derive(Debug)]
pub struct IpcServer {
    registry: Arc<ObjectRegistry>,
    cancel: CancellationToken,
    ipc_config: IpcConfig,
}

impl IpcServer {
    pub fn new(registry: Arc<ObjectRegistry>, ipc_config: IpcConfig) -> Self {
        Self {
            registry,
            cancel: CancellationToken::new(),
            ipc_config,
        }
    }

    /// Bind `addr` and serve until cancelled or a fatal error occurs.
    pub async fn serve(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on(&self, listener: TcpListener) -> std::io::Result<()> {
        let conn_semaphore = Arc::new(Semaphore::new(self.ipc_config.max_connections));
        tracing::info!(
            "IPC server listening on {} ({} objects, max_connections={})",
            listener.local_addr()?,
            self.registry.len(),
            self.ipc_config.max_connections,
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("IPC server shutting down");
                    break;
                }
                accept = listener.accept() => {
                    let (stream, peer) = accept?;

                    let permit = match conn_semaphore.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::warn!(
                                "Connection from {} rejected: at max_connections ({})",
                                peer,
                                self.ipc_config.max_connections,
                            );
                            drop(stream);
                            continue;
                        }
                    };

                    tracing::debug!("IPC connection from {} (active={})",
                        peer,
                        self.ipc_config.max_connections - conn_semaphore.available_permits(),
                    );
                    let registry = self.registry.clone();
                    let cancel = self.cancel.clone();
                    let ipc_config = self.ipc_config.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, registry, cancel, ipc_config, permit).await {
                            tracing::warn!("Connection from {} error: {}", peer, e);
                        }
                    });
                }
            }
        }
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Token that triggers shutdown when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Handle a single TCP connection: read frames → dispatch → write responses.
///
/// A successful Subscribe turns the connection into a signal stream for the
/// rest of its life.
async fn handle_connection(
    stream: TcpStream,
    registry: Arc<ObjectRegistry>,
    cancel: CancellationToken,
    ipc_config: IpcConfig,
    _permit: OwnedSemaphorePermit, // held for connection lifetime
) -> std::io::Result<()> {
    let (mut reader, mut writer) = stream.into_split();
    let write_timeout = ipc_config.write_timeout;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame_result = tokio::time::timeout(ipc_config.read_timeout, read_frame(&mut reader, ipc_config.max_frame_bytes)) => {
                let frame = match frame_result {
                    Err(_elapsed) => {
                        tracing::debug!("Read timeout ({:?}), dropping connection", ipc_config.read_timeout);
                        break;
                    }
                    Ok(result) => match result? {
                        Some(f) => f,
                        None => break, // clean EOF
                    },
                };

                let (msg_type, payload_bytes) = frame;

                if msg_type != MSG_REQUEST {
                    let message = format!("Unexpected message type: 0x{:02X}", msg_type);
                    write_error(&mut writer, "", CODE_INVALID_ARGUMENT, &message, write_timeout).await?;
                    continue;
                }

                let request = match decode_msgpack(&payload_bytes) {
                    Ok(v) => Request::from_json(&v),
                    Err(e) => {
                        write_error(&mut writer, "", CODE_INVALID_ARGUMENT, &e.to_string(), write_timeout).await?;
                        continue;
                    }
                };

                match dispatch::dispatch(&registry, &request, &ipc_config).await {
                    Ok(DispatchResponse::Single(response_body)) => {
                        let response = serde_json::json!({
                            "id": request.id,
                            "ok": true,
                            "body": response_body,
                        });
                        timed_write(&mut writer, MSG_RESPONSE, &encode_msgpack(&response)?, write_timeout).await?;
                    }
                    Ok(DispatchResponse::Stream { ack, mut rx }) => {
                        let response = serde_json::json!({
                            "id": request.id,
                            "ok": true,
                            "body": ack,
                        });
                        timed_write(&mut writer, MSG_RESPONSE, &encode_msgpack(&response)?, write_timeout).await?;

                        // The peer only listens from here on, so watching the read
                        // half is how a vanished subscriber gets noticed.
                        let peer_closed = wait_for_peer_close(&mut reader, ipc_config.max_frame_bytes);
                        tokio::pin!(peer_closed);

                        loop {
                            tokio::select! {
                                _ = cancel.cancelled() => break,
                                () = &mut peer_closed => {
                                    tracing::debug!("Subscriber on {} disconnected", request.path);
                                    return Ok(());
                                }
                                chunk = rx.recv() => {
                                    let Some(chunk) = chunk else { break };
                                    let frame = serde_json::json!({
                                        "id": request.id,
                                        "body": chunk,
                                    });
                                    timed_write(&mut writer, MSG_SIGNAL, &encode_msgpack(&frame)?, write_timeout).await?;
                                }
                            }
                        }

                        let end = serde_json::json!({ "id": request.id });
                        timed_write(&mut writer, MSG_STREAM_END, &encode_msgpack(&end)?, write_timeout).await?;
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("{} {} failed: {}", request.method, request.path, e);
                        write_error(&mut writer, &request.id, e.to_ipc_error_code(), &e.to_string(), write_timeout).await?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Resolve once the peer closes its side of a streaming connection.
///
/// Frames sent on a subscribed connection are read and discarded.
async fn wait_for_peer_close<R: tokio::io::AsyncReadExt + Unpin>(reader: &mut R, max_frame_bytes: u32) {
    loop {
        match read_frame(reader, max_frame_bytes).await {
            Ok(Some((msg_type, _))) => {
                tracing::debug!("Ignoring frame 0x{:02X} on subscribed connection", msg_type);
            }
            Ok(None) => return,
            Err(e) => {
                tracing::debug!("Subscribed connection read failed: {}", e);
                return;
            }
        }
    }
}

async fn write_error<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    request_id: &str,
    code: &str,
    message: &str,
    timeout: Duration,
) -> std::io::Result<()> {
    let response = serde_json::json!({
        "id": request_id,
        "ok": false,
        "error": {
            "code": code,
            "message": message,
        }
    });
    timed_write(writer, MSG_ERROR, &encode_msgpack(&response)?, timeout).await
}

/// Write a frame with a timeout. Returns an error if the write takes too long
/// (prevents slow consumers from holding connections indefinitely).
async fn timed_write<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg_type: u8,
    payload: &[u8],
    timeout: Duration,
) -> std::io::Result<()> {
    tokio::time::timeout(timeout, write_frame(writer, msg_type, payload))
        .await
        .map_err(|_| {
            tracing::warn!("Write timeout ({:?}), dropping connection", timeout);
            std::io::Error::new(std::io::ErrorKind::TimedOut, "write timeout")
        })?
}
