//! Metadata carried across the relay hop.
//!
//! Application metadata (election ids, role headers, custom keys) passes
//! through in both directions. Headers owned by the HTTP/2 and gRPC
//! transport are dropped so each hop negotiates its own.

use tonic::metadata::MetadataMap;
use tonic::{Extensions, Request, Response};

/// Transport-level headers that never cross the relay.
pub const TRANSPORT_HEADERS: &[&str] = &[
    "te",
    "host",
    "date",
    "content-type",
    "content-length",
    "user-agent",
    "grpc-timeout",
    "grpc-encoding",
    "grpc-accept-encoding",
    "grpc-status",
    "grpc-message",
];

/// Remove every [`TRANSPORT_HEADERS`] entry from `metadata`.
pub fn strip_transport_headers(metadata: &mut MetadataMap) {
    for header in TRANSPORT_HEADERS {
        metadata.remove(*header);
    }
}

/// Rebuild a controller request for the target: same message, same
/// application metadata, fresh extensions.
pub fn outbound_request<T>(request: Request<T>) -> Request<T> {
    let (mut metadata, _extensions, message) = request.into_parts();
    strip_transport_headers(&mut metadata);
    Request::from_parts(metadata, Extensions::default(), message)
}

/// Rebuild a target response for the controller, mapping the body with `f`.
pub fn inbound_response<T, U>(response: Response<T>, f: impl FnOnce(T) -> U) -> Response<U> {
    let (mut metadata, message, extensions) = response.into_parts();
    strip_transport_headers(&mut metadata);
    Response::from_parts(metadata, f(message), extensions)
}
