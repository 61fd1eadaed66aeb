//! mapr Relay Server
//!
//! Transparent P4Runtime relay that logs every message between a controller
//! and a switch.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use mapr_core::RelayConfig;
use mapr_core::config::load_config_file;
use mapr_core::tracing_init::init_tracing;
use mapr_relay::RelayServer;

#[derive(Parser, Debug)]
#[command(name = "mapr-relay")]
#[command(version, about = "mapr relay - transparent P4Runtime relay with message logging")]
struct Args {
    /// Downstream P4Runtime target (`host:port`).
    #[arg(long, env = "MAPR_TARGET_ADDR")]
    target_addr: Option<String>,

    /// Port to accept controller connections on (all interfaces).
    #[arg(long, env = "MAPR_SERVER_PORT")]
    server_port: Option<u16>,

    /// Number of worker threads serving calls.
    #[arg(long, env = "MAPR_WORKERS")]
    workers: Option<usize>,

    /// Deadline for unary calls to the target, in seconds.
    #[arg(long, env = "MAPR_TIMEOUT")]
    timeout: Option<u64>,

    /// Seconds in-flight calls get to finish on shutdown.
    #[arg(long, env = "MAPR_SHUTDOWN_GRACE")]
    shutdown_grace: Option<u64>,

    /// Largest message accepted in either direction, in bytes.
    #[arg(long, env = "MAPR_MAX_MESSAGE_BYTES")]
    max_message_bytes: Option<usize>,

    /// JSON config file; flags and environment override its values.
    #[arg(long, env = "MAPR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level for relay events (`RUST_LOG` takes precedence).
    #[arg(long, env = "MAPR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    /// Merge defaults, the config file and explicit flags, in that order.
    fn resolve(&self) -> anyhow::Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)?,
            None => RelayConfig::default(),
        };
        if let Some(addr) = &self.target_addr {
            config.target_addr.clone_from(addr);
        }
        if let Some(port) = self.server_port {
            config.server_port = port;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(secs) = self.timeout {
            config.unary_timeout_secs = secs;
        }
        if let Some(secs) = self.shutdown_grace {
            config.shutdown_grace_secs = secs;
        }
        if let Some(bytes) = self.max_message_bytes {
            config.max_message_bytes = bytes;
        }
        if let Some(level) = &self.log_level {
            config.log_level.clone_from(level);
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.resolve()?;

    init_tracing(&config.log_level, args.log_json).context("Failed to install log subscriber")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        target = %config.target_addr,
        port = config.server_port,
        "Starting mapr-relay"
    );

    // The worker pool bounds how many calls make progress at once.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .thread_name("mapr-worker")
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    runtime.block_on(async move {
        let server = RelayServer::new(config)?;
        server.serve(shutdown_signal()).await?;
        Ok::<(), anyhow::Error>(())
    })
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
