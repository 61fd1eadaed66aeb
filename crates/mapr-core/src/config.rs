//! Configuration for the mapr relay.
//!
//! Resolution order (lowest to highest priority):
//! 1. Built-in defaults
//! 2. JSON config file (`--config`), missing keys fall back to defaults
//! 3. Environment variables and CLI arguments (applied by the binary)

use std::net::{Ipv6Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default downstream P4Runtime target.
pub const DEFAULT_TARGET_ADDR: &str = "localhost:28000";

/// Default port the relay listens on for controller connections.
pub const DEFAULT_SERVER_PORT: u16 = 28001;

/// Default size of the worker pool serving calls.
pub const DEFAULT_WORKERS: usize = 5;

/// Default deadline for unary calls to the target, in seconds.
pub const DEFAULT_UNARY_TIMEOUT_SECS: u64 = 10;

/// Default time in-flight calls get to finish after shutdown, in seconds.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Default cap on a single encoded message in either direction.
///
/// Pipeline configs carry whole device binaries, well past tonic's 4 MiB
/// default.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Complete relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// `host:port` (or full URI) of the downstream P4Runtime target.
    pub target_addr: String,
    /// Port to listen on for the upstream controller.
    pub server_port: u16,
    /// Number of runtime worker threads.
    pub workers: usize,
    /// Deadline applied to unary calls forwarded to the target.
    pub unary_timeout_secs: u64,
    /// Grace period for in-flight calls once shutdown starts.
    pub shutdown_grace_secs: u64,
    /// Largest message accepted from or sent to either peer.
    pub max_message_bytes: usize,
    /// Log level for the relay's own events.
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            target_addr: DEFAULT_TARGET_ADDR.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            workers: DEFAULT_WORKERS,
            unary_timeout_secs: DEFAULT_UNARY_TIMEOUT_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Set the downstream target address.
    #[must_use]
    pub fn with_target_addr(mut self, addr: impl Into<String>) -> Self {
        self.target_addr = addr.into();
        self
    }

    /// Set the listening port.
    #[must_use]
    pub const fn with_server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    /// Set the worker pool size.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the unary call deadline in seconds.
    #[must_use]
    pub const fn with_unary_timeout_secs(mut self, secs: u64) -> Self {
        self.unary_timeout_secs = secs;
        self
    }

    /// Set the shutdown grace period in seconds.
    #[must_use]
    pub const fn with_shutdown_grace_secs(mut self, secs: u64) -> Self {
        self.shutdown_grace_secs = secs;
        self
    }

    /// Set the message size cap.
    #[must_use]
    pub const fn with_max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// Set the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Target address as a URI tonic can dial.
    ///
    /// Bare `host:port` values get an `http://` scheme, matching the
    /// plaintext channel P4Runtime targets expose.
    pub fn target_uri(&self) -> String {
        if self.target_addr.contains("://") {
            self.target_addr.clone()
        } else {
            format!("http://{}", self.target_addr)
        }
    }

    /// Address to bind: all interfaces on `server_port`.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, self.server_port))
    }

    pub const fn unary_timeout(&self) -> Duration {
        Duration::from_secs(self.unary_timeout_secs)
    }

    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.target_addr.trim().is_empty() {
            return Err(Error::Config("target address must not be empty".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("worker pool size must be at least 1".into()));
        }
        if self.unary_timeout_secs == 0 {
            return Err(Error::Config("unary timeout must be at least 1 second".into()));
        }
        if self.max_message_bytes == 0 {
            return Err(Error::Config("max message size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Load a relay configuration from a JSON file.
///
/// Keys absent from the file keep their default values.
pub fn load_config_file(path: &Path) -> Result<RelayConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let config: RelayConfig = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    config.validate()?;
    Ok(config)
}
