//! Per-interface request handlers.

pub mod configuration;
