//! Logging layer around the forwarder.
//!
//! Each wrapper logs what the controller sent (`>>`) and what the relay hands
//! back (`<<`), then delegates to the forwarding closure. Stream messages are
//! logged by [`Tap`]s as they are pulled, never collected up front.

use std::fmt::Debug;
use std::future::Future;

use tonic::{Request, Response};
use tracing::info;

use crate::error_relay::RelayError;
use crate::logging::{Direction, log_msg};
use crate::tap::Tap;

/// Log a unary request and its response around `forward`.
pub async fn logged_unary<Req, Resp, F, Fut>(
    rpc: &'static str,
    request: Request<Req>,
    forward: F,
) -> Result<Response<Resp>, RelayError>
where
    Req: Debug,
    Resp: Debug,
    F: FnOnce(Request<Req>) -> Fut,
    Fut: Future<Output = Result<Response<Resp>, RelayError>>,
{
    log_msg(rpc, Direction::Inbound, request.get_ref());
    let response = forward(request).await?;
    log_msg(rpc, Direction::Outbound, response.get_ref());
    Ok(response)
}

/// Log a server-streaming request, then each response message as the
/// controller pulls it.
pub async fn logged_server_stream<Req, S, F, Fut>(
    rpc: &'static str,
    request: Request<Req>,
    forward: F,
) -> Result<Response<Tap<S>>, RelayError>
where
    Req: Debug,
    F: FnOnce(Request<Req>) -> Fut,
    Fut: Future<Output = Result<Response<S>, RelayError>>,
{
    log_msg(rpc, Direction::Inbound, request.get_ref());
    let response = forward(request).await?;
    Ok(response.map(|stream| Tap::new(rpc, Direction::Outbound, stream)))
}

/// Tap both halves of a bidirectional call.
///
/// The channel's close is logged when the controller-facing half is dropped,
/// or right away when the call never opens.
pub async fn logged_bidi_stream<In, Out, F, Fut>(
    rpc: &'static str,
    request: Request<In>,
    forward: F,
) -> Result<Response<Tap<Out>>, RelayError>
where
    F: FnOnce(Request<Tap<In>>) -> Fut,
    Fut: Future<Output = Result<Response<Out>, RelayError>>,
{
    info!(rpc, "Stream channel opened");
    let request = request.map(|inbound| Tap::new(rpc, Direction::Inbound, inbound));
    let response = match forward(request).await {
        Ok(response) => response,
        Err(e) => {
            info!(rpc, "Stream channel closed");
            return Err(e);
        }
    };
    Ok(response.map(|outbound| Tap::new(rpc, Direction::Outbound, outbound).announcing_close()))
}
