//! mapr relay library.
//!
//! A transparent `P4Runtime` relay. The controller connects to the relay as
//! if it were the switch; every call is forwarded unchanged to a single
//! target and every message crossing the relay is logged.
//!
//! Each call passes through three layers:
//! - [`error_relay`]: every failure, panics included, becomes a status
//! - [`logged`]: requests, responses and stream messages are logged
//! - [`forwarder`]: the call is issued on the shared target connection

pub mod error_relay;
pub mod forwarder;
pub mod logged;
pub mod logging;
pub mod metadata;
pub mod server;
pub mod tap;

pub use server::{RelayServer, ServerError, ServerState};
