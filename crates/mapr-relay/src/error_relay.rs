//! Error relay: turns every failure of a relayed call into a status for the
//! controller.
//!
//! Target failures are returned with the target's own code, message and
//! details. Relay-local faults, panics included, become `Unknown` with a
//! descriptive message. Nothing escapes as a panic into the serving loop.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tokio_stream::Stream;
use tonic::{Response, Status};
use tracing::error;

use crate::logging::{explain_status, log_status};
use crate::metadata::strip_transport_headers;

/// Failure of a single relayed call.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The target (or the transport to it) failed the call.
    #[error("target failed: {}", explain_status(.0))]
    Target(Status),

    /// A unary call did not complete within the deadline.
    #[error("no response from target within {0:?}")]
    Timeout(Duration),

    /// A fault inside the relay itself.
    #[error("{0}")]
    Internal(String),
}

impl From<Status> for RelayError {
    fn from(status: Status) -> Self {
        Self::Target(status)
    }
}

impl From<RelayError> for Status {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Target(mut status) => {
                strip_transport_headers(status.metadata_mut());
                status
            }
            RelayError::Timeout(limit) => Self::deadline_exceeded(format!(
                "Deadline exceeded: no response from target within {limit:?}"
            )),
            RelayError::Internal(detail) => Self::unknown(format!("relay error: {detail}")),
        }
    }
}

/// Run one relayed call, converting any failure or panic into a `Status`.
pub async fn relay_call<T, F>(rpc: &'static str, call: F) -> Result<Response<T>, Status>
where
    F: Future<Output = Result<Response<T>, RelayError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(err)) => Err(fail(rpc, err)),
        Err(payload) => Err(fail(rpc, RelayError::Internal(panic_message(payload.as_ref())))),
    }
}

/// Wrap a relayed response stream so that failures are logged and panics
/// while polling become a final `Unknown` status.
pub const fn relay_stream<S>(rpc: &'static str, inner: S) -> RelayedStream<S> {
    RelayedStream {
        rpc,
        inner,
        done: false,
    }
}

/// Stream returned by [`relay_stream`].
///
/// Yields the inner stream's messages unchanged. After the first error, or
/// a panic, it ends.
pub struct RelayedStream<S> {
    rpc: &'static str,
    inner: S,
    done: bool,
}

impl<S, M> Stream for RelayedStream<S>
where
    S: Stream<Item = Result<M, Status>> + Unpin,
{
    type Item = Result<M, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }
        let polled =
            std::panic::catch_unwind(AssertUnwindSafe(|| Pin::new(&mut this.inner).poll_next(cx)));
        match polled {
            Ok(Poll::Ready(Some(Err(status)))) => {
                this.done = true;
                Poll::Ready(Some(Err(fail(this.rpc, RelayError::Target(status)))))
            }
            Ok(Poll::Ready(None)) => {
                this.done = true;
                Poll::Ready(None)
            }
            Ok(other) => other,
            Err(payload) => {
                this.done = true;
                let fault = RelayError::Internal(panic_message(payload.as_ref()));
                Poll::Ready(Some(Err(fail(this.rpc, fault))))
            }
        }
    }
}

fn fail(rpc: &'static str, err: RelayError) -> Status {
    if let RelayError::Internal(detail) = &err {
        error!(rpc, fault = %detail, "Internal relay fault");
    }
    let status = Status::from(err);
    log_status(rpc, &status);
    status
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
