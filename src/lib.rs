//! # confsync - Configuration Synchronization Service
//!
//! A server owns one configuration record per registered application and
//! broadcasts every accepted change; per-application clients cache the
//! fields they need and react to those broadcasts.
//!
//! ## Architecture
//!
//! ```text
//!   *.json ──loader──▶ ObjectRegistry ◀──dispatch── IpcServer ◀── requests
//!                      │  ConfigObject (mutex)                 ──▶ replies
//!                      │      │ emit
//!                      ▼      ▼
//!                      SignalBus ──▶ subscription streams ──▶ clients
//!                                                               │
//!                                                     ClientCache (mutex)
//!                                                               │
//!                                                            Worker
//! ```
//!
//! The registry is built once and never mutated, so it is shared without a
//! lock. Each object serializes its own mutate-then-broadcast sequence.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod client;
pub mod ipc;
pub mod loader;
pub mod registry;
pub mod types;
pub mod value;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, IpcConfig, Result};
pub use value::{ConfigRecord, Value};
