//! Error types for kvprobe data model validation.

use thiserror::Error;

/// Errors raised while constructing harness inputs.
///
/// These are configuration faults: they are reported at startup and never
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Endpoint host was empty.
    #[error("node host must not be empty")]
    EmptyHost,

    /// Endpoint port was zero.
    #[error("node port must be in 1..=65535, got {0}")]
    InvalidPort(u16),

    /// Endpoint string was not `host:port`.
    #[error("invalid node address {0:?}: expected host:port")]
    InvalidAddress(String),

    /// A node set must hold at least one endpoint.
    #[error("node set must not be empty")]
    EmptyNodeSet,

    /// Command text contained a newline.
    #[error("command must not contain a newline: {0:?}")]
    NewlineInCommand(String),
}
