//! Call forwarder: issues each relayed call on the shared target connection.
//!
//! The forwarder knows nothing about message types. Each service method hands
//! it a closure that performs the concrete client call; the forwarder owns
//! metadata passthrough, deadlines and error conversion around it.

use std::future::Future;
use std::time::Duration;

use mapr_proto::v1::p4_runtime_client::P4RuntimeClient;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tonic::transport::Channel;
use tonic::{Request, Response, Status};
use tracing::warn;

use crate::error_relay::RelayError;
use crate::metadata::{inbound_response, outbound_request};

/// Client for the downstream target.
pub type TargetClient = P4RuntimeClient<Channel>;

/// Controller messages buffered on their way to the target.
const OUTBOUND_BUFFER: usize = 16;

/// Forwards calls to a single downstream target.
///
/// Cloning is cheap; clones share the underlying HTTP/2 connection, so
/// concurrent calls are multiplexed rather than serialized.
#[derive(Clone)]
pub struct Forwarder {
    target: TargetClient,
    unary_timeout: Duration,
}

impl Forwarder {
    pub fn new(channel: Channel, unary_timeout: Duration) -> Self {
        Self {
            target: P4RuntimeClient::new(channel),
            unary_timeout,
        }
    }

    /// Raise the limit on message size in both directions.
    #[must_use]
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.target = self
            .target
            .max_decoding_message_size(bytes)
            .max_encoding_message_size(bytes);
        self
    }

    /// Forward a unary call, failing with [`RelayError::Timeout`] when the
    /// target does not answer within the deadline.
    ///
    /// An expired call is dropped, which cancels it on the target.
    pub async fn unary<Req, Resp, F, Fut>(
        &self,
        request: Request<Req>,
        call: F,
    ) -> Result<Response<Resp>, RelayError>
    where
        F: FnOnce(TargetClient, Request<Req>) -> Fut,
        Fut: Future<Output = Result<Response<Resp>, Status>>,
    {
        self.with_deadline(outbound_request(request), call).await
    }

    /// Open a server-streaming call.
    ///
    /// The deadline bounds the whole call: the target sees it as
    /// `grpc-timeout`, and opening the stream locally may not exceed it.
    /// The returned stream is the target's, untouched.
    pub async fn server_stream<Req, S, F, Fut>(
        &self,
        request: Request<Req>,
        call: F,
    ) -> Result<Response<S>, RelayError>
    where
        F: FnOnce(TargetClient, Request<Req>) -> Fut,
        Fut: Future<Output = Result<Response<S>, Status>>,
    {
        let mut request = outbound_request(request);
        request.set_timeout(self.unary_timeout);
        self.with_deadline(request, call).await
    }

    /// Open a bidirectional call that runs until either side ends it.
    ///
    /// The controller's half is pumped by its own task into a bounded
    /// channel, so neither direction waits on the other. A failure on the
    /// controller's side ends the outbound half cleanly; the target then
    /// finishes the call on its own terms.
    pub fn bidi_stream<S, Req, Resp, F, Fut>(
        &self,
        rpc: &'static str,
        request: Request<S>,
        call: F,
    ) -> impl Future<Output = Result<Response<Resp>, RelayError>> + use<S, Req, Resp, F, Fut>
    where
        S: Stream<Item = Result<Req, Status>> + Send + 'static,
        Req: Send + 'static,
        F: FnOnce(TargetClient, Request<ReceiverStream<Req>>) -> Fut,
        Fut: Future<Output = Result<Response<Resp>, Status>>,
    {
        let request = outbound_request(request).map(|inbound| pump(rpc, inbound));
        let target = self.target.clone();
        async move {
            let response = call(target, request).await?;
            Ok(inbound_response(response, std::convert::identity))
        }
    }

    /// Run `call` on an already prepared request, bounded by the deadline.
    async fn with_deadline<Req, Resp, F, Fut>(
        &self,
        request: Request<Req>,
        call: F,
    ) -> Result<Response<Resp>, RelayError>
    where
        F: FnOnce(TargetClient, Request<Req>) -> Fut,
        Fut: Future<Output = Result<Response<Resp>, Status>>,
    {
        let response = tokio::time::timeout(self.unary_timeout, call(self.target.clone(), request))
            .await
            .map_err(|_| RelayError::Timeout(self.unary_timeout))??;
        Ok(inbound_response(response, std::convert::identity))
    }
}

/// Forward messages of `inbound` into a channel until its first error, the
/// end of the stream, or the call going away.
fn pump<S, M>(rpc: &'static str, inbound: S) -> ReceiverStream<M>
where
    S: Stream<Item = Result<M, Status>> + Send + 'static,
    M: Send + 'static,
{
    let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
    tokio::spawn(async move {
        let mut inbound = std::pin::pin!(inbound);
        loop {
            let item = tokio::select! {
                item = inbound.next() => item,
                () = tx.closed() => break,
            };
            match item {
                Some(Ok(msg)) => {
                    if tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Some(Err(status)) => {
                    warn!(rpc, code = ?status.code(), error = %status.message(), "Controller stream failed");
                    break;
                }
                None => break,
            }
        }
    });
    ReceiverStream::new(rx)
}
