//! Error types for the mapr core library.

use thiserror::Error;

/// Result type alias using mapr core `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for mapr operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
