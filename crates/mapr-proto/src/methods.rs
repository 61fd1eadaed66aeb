//! Named constants for the P4Runtime method strings.
//!
//! These are derived from the protobuf service definition and are used as
//! the `rpc` field on every relay log line, so that method names stay in
//! sync without duplicating string literals.

// ---------------------------------------------------------------------------
// P4Runtime
// ---------------------------------------------------------------------------

/// `P4Runtime/Write`
pub const METHOD_WRITE: &str = "P4Runtime/Write";

/// `P4Runtime/Read`
pub const METHOD_READ: &str = "P4Runtime/Read";

/// `P4Runtime/SetForwardingPipelineConfig`
pub const METHOD_SET_FORWARDING_PIPELINE_CONFIG: &str = "P4Runtime/SetForwardingPipelineConfig";

/// `P4Runtime/GetForwardingPipelineConfig`
pub const METHOD_GET_FORWARDING_PIPELINE_CONFIG: &str = "P4Runtime/GetForwardingPipelineConfig";

/// `P4Runtime/StreamChannel`
pub const METHOD_STREAM_CHANNEL: &str = "P4Runtime/StreamChannel";

/// `P4Runtime/Capabilities`
pub const METHOD_CAPABILITIES: &str = "P4Runtime/Capabilities";

/// All relayed methods, in service-definition order.
pub const ALL_METHODS: &[&str] = &[
    METHOD_WRITE,
    METHOD_READ,
    METHOD_SET_FORWARDING_PIPELINE_CONFIG,
    METHOD_GET_FORWARDING_PIPELINE_CONFIG,
    METHOD_STREAM_CHANNEL,
    METHOD_CAPABILITIES,
];
