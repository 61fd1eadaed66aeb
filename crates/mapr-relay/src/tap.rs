//! Stream tap: logs every message of a stream as the consumer pulls it.

use std::fmt::Debug;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio_stream::Stream;
use tonic::Status;
use tracing::{debug, info};

use crate::logging::{Direction, log_msg};

/// Wraps a stream of relayed messages, logging each `Ok` element before
/// yielding it unchanged.
///
/// The tap holds no buffer: it is pending exactly when the inner stream is,
/// so back-pressure passes straight through. `Err` elements are forwarded
/// without a message line; failures are logged by the error relay. Once the
/// inner stream ends the tap keeps returning `None`.
pub struct Tap<S> {
    rpc: &'static str,
    direction: Direction,
    inner: S,
    passed: u64,
    finished: bool,
    announce_close: bool,
}

impl<S> Tap<S> {
    pub const fn new(rpc: &'static str, direction: Direction, inner: S) -> Self {
        Self {
            rpc,
            direction,
            inner,
            passed: 0,
            finished: false,
            announce_close: false,
        }
    }

    /// Log the end of the call at `info` when the tap is dropped.
    #[must_use]
    pub const fn announcing_close(mut self) -> Self {
        self.announce_close = true;
        self
    }

    /// Number of messages that have passed through so far.
    pub const fn passed(&self) -> u64 {
        self.passed
    }
}

impl<S, M> Stream for Tap<S>
where
    S: Stream<Item = Result<M, Status>> + Unpin,
    M: Debug,
{
    type Item = Result<M, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(msg))) => {
                this.passed += 1;
                log_msg(this.rpc, this.direction, &msg);
                Poll::Ready(Some(Ok(msg)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            self.inner.size_hint()
        }
    }
}

impl<S> Drop for Tap<S> {
    fn drop(&mut self) {
        if self.announce_close {
            info!(rpc = self.rpc, messages = self.passed, "Stream channel closed");
            return;
        }
        debug!(
            rpc = self.rpc,
            direction = %self.direction,
            messages = self.passed,
            finished = self.finished,
            "Stream closed"
        );
    }
}
