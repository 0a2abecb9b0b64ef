//! Error types for eventlist
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Propagation
//!
//! Validation errors (bad index, bad transaction state, bad range) are raised
//! before any mutation or event is begun, so the failed operation has no
//! effect. Listener failures are never surfaced here: they are isolated and
//! logged by the dispatcher.

use thiserror::Error;

/// Result type alias for eventlist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for event lists and replicated resources
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Index outside `[0, size)` (or `[0, size]` for inserts)
    #[error("Index out of range: index {index}, size {size}")]
    IndexOutOfRange {
        /// Offending index
        index: usize,
        /// Size of the list when the operation was attempted
        size: usize,
    },

    /// Change recorded or committed with no open transaction, or a
    /// non-nested transaction opened while another is still open
    #[error("Illegal transaction state: {0}")]
    IllegalTransactionState(String),

    /// Change block whose start lies after its end
    #[error("Invalid change range: start {start} > end {end}")]
    InvalidRange {
        /// Range start
        start: usize,
        /// Range end (inclusive)
        end: usize,
    },

    /// Backing storage diverged from the size the list expected
    #[error("Concurrent access violation: expected size {expected}, storage reports {actual}")]
    ConcurrentAccessViolation {
        /// Size the list expected after the mutation
        expected: usize,
        /// Size reported by storage
        actual: usize,
    },

    /// Payload could not be decoded into a value
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Value could not be encoded into a payload
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Replication update addressed to a different resource
    #[error("Resource mismatch: expected '{expected}', got '{actual}'")]
    ResourceMismatch {
        /// Name of the resource the update was applied to
        expected: String,
        /// Name carried by the update
        actual: String,
    },

    /// Configuration text could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An update could not be delivered to a peer
    #[error("Replication error: {0}")]
    Replication(String),
}

impl Error {
    /// Build an `IllegalTransactionState` error
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Error::IllegalTransactionState(msg.into())
    }

    /// Returns true if the failed operation is guaranteed to have had no effect
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::IndexOutOfRange { .. }
                | Error::IllegalTransactionState(_)
                | Error::InvalidRange { .. }
                | Error::Deserialization(_)
                | Error::ResourceMismatch { .. }
        )
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Deserialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
