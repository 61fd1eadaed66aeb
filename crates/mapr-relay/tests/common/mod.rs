//! Shared fixtures for relay integration tests: a scriptable mock target and
//! helpers to run a relay in front of it.

#![allow(dead_code, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tokio_stream::{Stream, StreamExt};
use tonic::transport::{Channel, Server};
use tonic::{Request, Response, Status, Streaming};

use mapr_core::RelayConfig;
use mapr_proto::v1::p4_runtime_client::P4RuntimeClient;
use mapr_proto::v1::p4_runtime_server::{P4Runtime, P4RuntimeServer};
use mapr_proto::v1::{
    CapabilitiesRequest, CapabilitiesResponse, Entity, ForwardingPipelineConfig,
    GetForwardingPipelineConfigRequest, GetForwardingPipelineConfigResponse,
    MasterArbitrationUpdate, ReadRequest, ReadResponse, SetForwardingPipelineConfigRequest,
    SetForwardingPipelineConfigResponse, StreamMessageRequest, StreamMessageResponse,
    WriteRequest, WriteResponse, stream_message_request, stream_message_response,
};
use mapr_relay::{RelayServer, ServerError, ServerState};

pub const API_VERSION: &str = "1.3.0";

/// How the mock target answers.
#[derive(Clone, Default)]
pub struct Behaviour {
    /// Messages returned by `Read`; the i-th carries i entities.
    pub read_responses: usize,
    /// Messages sent on `StreamChannel` once the controller half-closes.
    pub stream_responses: usize,
    /// Answer each `StreamChannel` message as soon as it arrives.
    pub echo: bool,
    /// Delay before answering any unary call.
    pub delay: Duration,
    /// Fail every call with this status.
    pub failure: Option<Status>,
}

/// P4Runtime target double.
pub struct MockTarget {
    behaviour: Behaviour,
    pipeline: Arc<Mutex<Option<ForwardingPipelineConfig>>>,
    received: mpsc::UnboundedSender<StreamMessageRequest>,
}

type BoxStream<M> = Pin<Box<dyn Stream<Item = Result<M, Status>> + Send>>;

impl MockTarget {
    async fn answer(&self) -> Result<(), Status> {
        if !self.behaviour.delay.is_zero() {
            tokio::time::sleep(self.behaviour.delay).await;
        }
        match &self.behaviour.failure {
            Some(status) => Err(status.clone()),
            None => Ok(()),
        }
    }
}

#[tonic::async_trait]
impl P4Runtime for MockTarget {
    type ReadStream = BoxStream<ReadResponse>;
    type StreamChannelStream = BoxStream<StreamMessageResponse>;

    async fn write(
        &self,
        request: Request<WriteRequest>,
    ) -> Result<Response<WriteResponse>, Status> {
        self.answer().await?;
        let mut response = Response::new(WriteResponse {});
        // Echo application metadata so passthrough is observable.
        if let Some(role) = request.metadata().get("x-role") {
            response.metadata_mut().insert("x-echo-role", role.clone());
        }
        Ok(response)
    }

    async fn read(
        &self,
        _request: Request<ReadRequest>,
    ) -> Result<Response<Self::ReadStream>, Status> {
        self.answer().await?;
        let items: Vec<Result<ReadResponse, Status>> = (0..self.behaviour.read_responses)
            .map(|i| {
                Ok(ReadResponse {
                    entities: vec![Entity::default(); i],
                })
            })
            .collect();
        Ok(Response::new(Box::pin(tokio_stream::iter(items))))
    }

    async fn set_forwarding_pipeline_config(
        &self,
        request: Request<SetForwardingPipelineConfigRequest>,
    ) -> Result<Response<SetForwardingPipelineConfigResponse>, Status> {
        self.answer().await?;
        *self.pipeline.lock().unwrap() = request.into_inner().config;
        Ok(Response::new(SetForwardingPipelineConfigResponse {}))
    }

    async fn get_forwarding_pipeline_config(
        &self,
        _request: Request<GetForwardingPipelineConfigRequest>,
    ) -> Result<Response<GetForwardingPipelineConfigResponse>, Status> {
        self.answer().await?;
        let config = self.pipeline.lock().unwrap().clone();
        match config {
            Some(config) => Ok(Response::new(GetForwardingPipelineConfigResponse {
                config: Some(config),
            })),
            None => Err(Status::failed_precondition("No forwarding pipeline config set")),
        }
    }

    async fn stream_channel(
        &self,
        request: Request<Streaming<StreamMessageRequest>>,
    ) -> Result<Response<Self::StreamChannelStream>, Status> {
        if let Some(status) = &self.behaviour.failure {
            return Err(status.clone());
        }
        let mut inbound = request.into_inner();
        let received = self.received.clone();
        let responses = self.behaviour.stream_responses;
        let echo = self.behaviour.echo;
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            while let Some(Ok(msg)) = inbound.next().await {
                if echo && tx.send(Ok(echo_of(&msg))).await.is_err() {
                    return;
                }
                let _ = received.send(msg);
            }
            for i in 0..responses {
                let msg = arbitration_response(i as u64);
                if tx.send(Ok(msg)).await.is_err() {
                    break;
                }
            }
        });
        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    async fn capabilities(
        &self,
        _request: Request<CapabilitiesRequest>,
    ) -> Result<Response<CapabilitiesResponse>, Status> {
        self.answer().await?;
        Ok(Response::new(CapabilitiesResponse {
            p4runtime_api_version: API_VERSION.into(),
        }))
    }
}

pub fn arbitration_response(device_id: u64) -> StreamMessageResponse {
    StreamMessageResponse {
        update: Some(stream_message_response::Update::Arbitration(
            MasterArbitrationUpdate {
                device_id,
                ..Default::default()
            },
        )),
    }
}

/// Arbitration reply carrying the device id of `request`, if it has one.
pub fn echo_of(request: &StreamMessageRequest) -> StreamMessageResponse {
    match &request.update {
        Some(stream_message_request::Update::Arbitration(a)) => arbitration_response(a.device_id),
        _ => arbitration_response(0),
    }
}

/// A running mock target.
pub struct Target {
    pub addr: SocketAddr,
    /// Stream messages the target received, in arrival order.
    pub received: mpsc::UnboundedReceiver<StreamMessageRequest>,
}

/// Start a mock target on an ephemeral port.
pub async fn spawn_target(behaviour: Behaviour) -> Target {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, received) = mpsc::unbounded_channel();
    let target = MockTarget {
        behaviour,
        pipeline: Arc::new(Mutex::new(None)),
        received: tx,
    };
    tokio::spawn(
        Server::builder()
            .add_service(
                P4RuntimeServer::new(target)
                    .max_decoding_message_size(usize::MAX)
                    .max_encoding_message_size(usize::MAX),
            )
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );
    Target { addr, received }
}

/// A running relay.
pub struct Relay {
    pub addr: SocketAddr,
    pub state: watch::Receiver<ServerState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl Relay {
    /// Trigger shutdown and wait for the server to return.
    pub async fn stop(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap()
    }
}

/// Relay config pointing at `target`, with short deadlines for tests.
pub fn relay_config(target: SocketAddr) -> RelayConfig {
    RelayConfig::default()
        .with_target_addr(target.to_string())
        .with_unary_timeout_secs(2)
        .with_shutdown_grace_secs(1)
}

/// Start a relay on an ephemeral port and wait until it listens.
pub async fn spawn_relay(config: RelayConfig) -> Relay {
    let server = RelayServer::new(config).unwrap();
    let mut state = server.state();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_listener(listener, async {
        let _ = rx.await;
    }));
    state
        .wait_for(|s| *s == ServerState::Listening)
        .await
        .unwrap();
    Relay {
        addr,
        state,
        shutdown: Some(tx),
        handle,
    }
}

/// Controller-side client connected to `addr`.
pub async fn connect(addr: SocketAddr) -> P4RuntimeClient<Channel> {
    P4RuntimeClient::connect(format!("http://{addr}"))
        .await
        .unwrap()
        .max_decoding_message_size(usize::MAX)
        .max_encoding_message_size(usize::MAX)
}

/// Target plus relay in front of it, and a client connected to the relay.
pub async fn relay_in_front_of(
    behaviour: Behaviour,
) -> (Target, Relay, P4RuntimeClient<Channel>) {
    let target = spawn_target(behaviour).await;
    let relay = spawn_relay(relay_config(target.addr)).await;
    let client = connect(relay.addr).await;
    (target, relay, client)
}
