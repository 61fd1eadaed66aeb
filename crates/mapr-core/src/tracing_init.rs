//! Log subscriber setup for the relay.
//!
//! `RUST_LOG` wins when set; otherwise the relay logs at the configured
//! level and transport internals stay quiet.

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt};

/// Install the global subscriber for the relay at `level`, as JSON lines
/// when `log_json` is set.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(level: &str, log_json: bool) -> Result<(), TryInitError> {
    let output = if log_json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(output.with_filter(env_filter(level)))
        .try_init()
}

/// Filter from `RUST_LOG`, falling back to [`relay_filter`] for `level`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(relay_filter(level)))
}

/// Default filter directive: the relay's own target gets `level`, tonic
/// and h2 stay at `warn`.
pub fn relay_filter(level: &str) -> String {
    format!("mapr_relay={level},tonic=warn,h2=warn")
}
