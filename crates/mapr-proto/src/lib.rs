//! P4Runtime Protocol Buffers
//!
//! Generated protobuf code for the P4Runtime API served and consumed by the
//! mapr relay.
//!
//! This crate contains:
//! - `p4::v1` with the `P4Runtime` service (server and client)
//! - `p4::config::v1` with the `P4Info` pipeline description
//! - `google::rpc::Status` embedded in arbitration updates

#![allow(clippy::derive_partial_eq_without_eq)]
#![allow(clippy::pedantic, clippy::nursery)]

pub mod methods;

/// Google RPC common types.
pub mod google {
    pub mod rpc {
        tonic::include_proto!("google.rpc");
    }
}

/// P4 API definitions.
///
/// Module nesting mirrors the protobuf packages so that generated
/// cross-package references (`super::super::...`) resolve.
pub mod p4 {
    pub mod config {
        pub mod v1 {
            tonic::include_proto!("p4.config.v1");
        }
    }

    pub mod v1 {
        tonic::include_proto!("p4.v1");
    }
}

// Re-export p4.v1 as the default API version for convenience
pub use p4::v1;

// Re-export prost_types for downstream crates that need Any
pub use prost_types;
