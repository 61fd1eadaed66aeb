//! mapr Core Library
//!
//! Shared functionality for the mapr relay:
//! - Relay configuration with defaults and JSON config-file loading
//! - Common error types
//! - Tracing subscriber initialisation

pub mod config;
pub mod error;
pub mod tracing_init;

pub use config::RelayConfig;
pub use error::{Error, Result};
