//! gRPC server for the mapr relay.

pub mod p4runtime_svc;

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Endpoint, Server};
use tracing::{info, warn};

use mapr_core::RelayConfig;
use mapr_proto::methods::ALL_METHODS;
use mapr_proto::v1::p4_runtime_server::P4RuntimeServer;

use crate::forwarder::Forwarder;

pub use p4runtime_svc::P4RuntimeRelay;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] mapr_core::Error),
}

/// Lifecycle of a [`RelayServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Listening,
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Listening => "listening",
            Self::Stopped => "stopped",
        })
    }
}

/// Relay server: accepts controller connections and relays every call to
/// the configured target.
pub struct RelayServer {
    config: RelayConfig,
    relay: P4RuntimeRelay,
    state: watch::Sender<ServerState>,
}

impl RelayServer {
    /// Build a server that dials `config.target_addr` on first use.
    ///
    /// The target does not need to be up yet; calls made while it is
    /// unreachable fail with `Unavailable`.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let channel = Endpoint::from_shared(config.target_uri())?
            .tcp_nodelay(true)
            .http2_keep_alive_interval(Duration::from_secs(30))
            .keep_alive_while_idle(true)
            .connect_lazy();
        Ok(Self::with_channel(config, channel))
    }

    /// Build a server over an existing channel to the target.
    pub fn with_channel(config: RelayConfig, channel: Channel) -> Self {
        let forwarder = Forwarder::new(channel, config.unary_timeout())
            .with_max_message_size(config.max_message_bytes);
        let (state, _) = watch::channel(ServerState::Created);
        Self {
            config,
            relay: P4RuntimeRelay::new(forwarder),
            state,
        }
    }

    /// Subscribe to lifecycle changes.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Bind the configured port and serve until `shutdown` resolves.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        self.serve_with_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// New calls are refused once shutdown starts. Calls in flight get the
    /// configured grace period to finish before the server stops.
    pub async fn serve_with_listener(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServerError> {
        let local_addr: SocketAddr = listener.local_addr()?;
        let grace = self.config.shutdown_grace();
        let max_message_bytes = self.config.max_message_bytes;

        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<P4RuntimeServer<P4RuntimeRelay>>()
            .await;

        let service = P4RuntimeServer::new(self.relay)
            .max_decoding_message_size(max_message_bytes)
            .max_encoding_message_size(max_message_bytes);

        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let server = Server::builder()
            .tcp_nodelay(true)
            .http2_keepalive_interval(Some(Duration::from_secs(30)))
            .http2_keepalive_timeout(Some(Duration::from_secs(10)))
            .add_service(health_service)
            .add_service(service)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = drain_rx.await;
            });
        tokio::pin!(server);

        info!(
            addr = %local_addr,
            target = %self.config.target_addr,
            workers = self.config.workers,
            unary_timeout = ?self.config.unary_timeout(),
            "Relay listening"
        );
        for method in ALL_METHODS {
            info!(method, "Relaying");
        }
        self.state.send_replace(ServerState::Listening);

        let result = tokio::select! {
            result = &mut server => result,
            () = shutdown => {
                info!(grace = ?grace, "Shutdown requested, draining in-flight calls");
                health_reporter
                    .set_not_serving::<P4RuntimeServer<P4RuntimeRelay>>()
                    .await;
                let _ = drain_tx.send(());
                match tokio::time::timeout(grace, &mut server).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(grace = ?grace, "Grace period elapsed, dropping remaining calls");
                        Ok(())
                    }
                }
            }
        };

        self.state.send_replace(ServerState::Stopped);
        info!("Relay stopped");
        result.map_err(ServerError::from)
    }
}
