//! Per-application client: cached settings kept in sync by server signals
//! while a foreground loop works off them.
//!
//! ```text
//!   server ──signal──▶ listener ──apply_update──▶ ┌─────────────┐
//!                                                 │ ClientCache │ (one mutex)
//!                      worker ◀──snapshot──────── └─────────────┘
//!                        │
//!                        └─ print phrase, sleep interval, repeat
//! ```

pub mod cache;
pub mod listener;
pub mod settings;
pub mod worker;

pub use cache::{AppliedUpdate, CacheSnapshot, ClientCache};
pub use listener::listen;
pub use settings::ClientSettings;
pub use worker::Worker;

/// Record key holding the work interval in milliseconds.
pub const TIMEOUT_KEY: &str = "Timeout";

/// Record key holding the phrase the worker reports.
pub const PHRASE_KEY: &str = "TimeoutPhrase";

/// Application the client binary serves when none is given.
pub const DEFAULT_APP: &str = "confManagerApplication1";
