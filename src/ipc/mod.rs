//! TCP+msgpack IPC transport layer.
//!
//! Length-prefixed msgpack framing carries requests to configuration objects
//! and, on subscribed connections, `configurationChanged` signals back out.

pub mod client;
pub mod codec;
pub mod dispatch;
pub mod handlers;
pub mod server;

pub use client::{IpcClient, ReceivedSignal, SignalStream};
pub use server::IpcServer;
