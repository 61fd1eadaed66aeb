//! Message logger: bounded, single-line renderings of relayed messages.
//!
//! Every message crossing the relay is rendered as `TypeName { fields }`
//! and emitted with a direction marker: `>>` for traffic arriving from the
//! controller, `<<` for traffic the relay sends back to it.

use std::fmt;

use tonic::Status;
use tracing::{info, warn};

/// Maximum number of characters of a message's field rendering kept in a
/// log line.
pub const MAX_MSG_LEN: usize = 255;

/// Appended to renderings cut at [`MAX_MSG_LEN`].
pub const TRUNCATION_MARKER: &str = "... TRUNCATED!";

/// Which way a message is travelling relative to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Controller to relay (requests, outgoing stream messages).
    Inbound,
    /// Relay to controller (responses, incoming stream messages, failures).
    Outbound,
}

impl Direction {
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Inbound => ">>",
            Self::Outbound => "<<",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Render `msg` as its short type name plus a one-line rendering of its
/// fields, truncated at [`MAX_MSG_LEN`] characters.
///
/// Works for any `Debug` value and never fails: a message without fields
/// renders as `TypeName {}`.
pub fn explain_msg<M: fmt::Debug>(msg: &M) -> String {
    let name = short_type_name::<M>();
    let rendered = format!("{msg:?}").replace(['\n', '\r'], " ");

    // prost's derived Debug already leads with the type name.
    let fields = rendered
        .strip_prefix(name)
        .map_or(rendered.as_str(), str::trim_start);
    let fields = if fields.is_empty() { "{}" } else { fields };

    format!("{name} {}", truncate(fields))
}

/// Render a failure as `Code: message`.
pub fn explain_status(status: &Status) -> String {
    format!("{:?}: {}", status.code(), status.message())
}

/// Log a relayed message.
pub fn log_msg<M: fmt::Debug>(rpc: &str, direction: Direction, msg: &M) {
    info!(rpc, "{} {}", direction, explain_msg(msg));
}

/// Log a failure returned to the controller.
pub fn log_status(rpc: &str, status: &Status) {
    warn!(
        rpc,
        code = ?status.code(),
        "{} {}",
        Direction::Outbound,
        explain_status(status)
    );
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_MSG_LEN) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Last path segment of `M`'s type name, without generic arguments.
fn short_type_name<M>() -> &'static str {
    let full = std::any::type_name::<M>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
