//! `P4Runtime` service that relays every call to the downstream target.

use std::pin::Pin;

use tokio_stream::Stream;
use tonic::{Request, Response, Status, Streaming};
use tracing::instrument;

use mapr_proto::methods::{
    METHOD_CAPABILITIES, METHOD_GET_FORWARDING_PIPELINE_CONFIG, METHOD_READ,
    METHOD_SET_FORWARDING_PIPELINE_CONFIG, METHOD_STREAM_CHANNEL, METHOD_WRITE,
};
use mapr_proto::v1::p4_runtime_server::P4Runtime;
use mapr_proto::v1::{
    CapabilitiesRequest, CapabilitiesResponse, GetForwardingPipelineConfigRequest,
    GetForwardingPipelineConfigResponse, ReadRequest, ReadResponse,
    SetForwardingPipelineConfigRequest, SetForwardingPipelineConfigResponse,
    StreamMessageRequest, StreamMessageResponse, WriteRequest, WriteResponse,
};

use crate::error_relay::{relay_call, relay_stream};
use crate::forwarder::Forwarder;
use crate::logged::{logged_bidi_stream, logged_server_stream, logged_unary};

type RelayStream<M> = Pin<Box<dyn Stream<Item = Result<M, Status>> + Send>>;

/// Relays `P4Runtime` calls from the controller to a single target.
#[derive(Clone)]
pub struct P4RuntimeRelay {
    forwarder: Forwarder,
}

impl P4RuntimeRelay {
    pub const fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }
}

#[tonic::async_trait]
impl P4Runtime for P4RuntimeRelay {
    type ReadStream = RelayStream<ReadResponse>;
    type StreamChannelStream = RelayStream<StreamMessageResponse>;

    #[instrument(skip_all)]
    async fn write(
        &self,
        request: Request<WriteRequest>,
    ) -> Result<Response<WriteResponse>, Status> {
        let forwarder = self.forwarder.clone();
        relay_call(
            METHOD_WRITE,
            logged_unary(METHOD_WRITE, request, move |req| async move {
                forwarder
                    .unary(req, |mut target, req| async move { target.write(req).await })
                    .await
            }),
        )
        .await
    }

    #[instrument(skip_all)]
    async fn read(
        &self,
        request: Request<ReadRequest>,
    ) -> Result<Response<Self::ReadStream>, Status> {
        let forwarder = self.forwarder.clone();
        let response = relay_call(
            METHOD_READ,
            logged_server_stream(METHOD_READ, request, move |req| async move {
                forwarder
                    .server_stream(req, |mut target, req| async move { target.read(req).await })
                    .await
            }),
        )
        .await?;
        Ok(response.map(|stream| Box::pin(relay_stream(METHOD_READ, stream)) as Self::ReadStream))
    }

    #[instrument(skip_all)]
    async fn set_forwarding_pipeline_config(
        &self,
        request: Request<SetForwardingPipelineConfigRequest>,
    ) -> Result<Response<SetForwardingPipelineConfigResponse>, Status> {
        let forwarder = self.forwarder.clone();
        relay_call(
            METHOD_SET_FORWARDING_PIPELINE_CONFIG,
            logged_unary(
                METHOD_SET_FORWARDING_PIPELINE_CONFIG,
                request,
                move |req| async move {
                    forwarder
                        .unary(req, |mut target, req| async move {
                            target.set_forwarding_pipeline_config(req).await
                        })
                        .await
                },
            ),
        )
        .await
    }

    #[instrument(skip_all)]
    async fn get_forwarding_pipeline_config(
        &self,
        request: Request<GetForwardingPipelineConfigRequest>,
    ) -> Result<Response<GetForwardingPipelineConfigResponse>, Status> {
        let forwarder = self.forwarder.clone();
        relay_call(
            METHOD_GET_FORWARDING_PIPELINE_CONFIG,
            logged_unary(
                METHOD_GET_FORWARDING_PIPELINE_CONFIG,
                request,
                move |req| async move {
                    forwarder
                        .unary(req, |mut target, req| async move {
                            target.get_forwarding_pipeline_config(req).await
                        })
                        .await
                },
            ),
        )
        .await
    }

    #[instrument(skip_all)]
    async fn stream_channel(
        &self,
        request: Request<Streaming<StreamMessageRequest>>,
    ) -> Result<Response<Self::StreamChannelStream>, Status> {
        let forwarder = self.forwarder.clone();
        let response = relay_call(
            METHOD_STREAM_CHANNEL,
            logged_bidi_stream(METHOD_STREAM_CHANNEL, request, move |req| async move {
                forwarder
                    .bidi_stream(METHOD_STREAM_CHANNEL, req, |mut target, req| async move {
                        target.stream_channel(req).await
                    })
                    .await
            }),
        )
        .await?;
        Ok(response.map(|stream| {
            Box::pin(relay_stream(METHOD_STREAM_CHANNEL, stream)) as Self::StreamChannelStream
        }))
    }

    #[instrument(skip_all)]
    async fn capabilities(
        &self,
        request: Request<CapabilitiesRequest>,
    ) -> Result<Response<CapabilitiesResponse>, Status> {
        let forwarder = self.forwarder.clone();
        relay_call(
            METHOD_CAPABILITIES,
            logged_unary(METHOD_CAPABILITIES, request, move |req| async move {
                forwarder
                    .unary(req, |mut target, req| async move {
                        target.capabilities(req).await
                    })
                    .await
            }),
        )
        .await
    }
}
