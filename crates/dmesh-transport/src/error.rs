//! Transport-layer error type and its conversion into the workspace-wide
//! [`dmesh_proto::DmeshError`].

use dmesh_proto::DmeshError;
use thiserror::Error;

/// Errors raised by a [`crate::Transport`] adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The named transport's underlying carrier is not available right now
    /// (e.g. no clipboard on a headless host).
    #[error("transport {name} unavailable: {reason}")]
    Unavailable {
        /// Name of the transport.
        name: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The carrier returned data that is neither a `dmesh-msg` nor a
    /// `dmesh-id` envelope.
    #[error("unrecognized data on {name}: {reason}")]
    UnrecognizedData {
        /// Name of the transport.
        name: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Chunking or reassembly failed.
    #[error("chunking error: {reason}")]
    Chunking {
        /// Underlying chunker error, for diagnostics only.
        reason: String,
    },

    /// The payload exceeds what this transport can carry in one unit and it
    /// does not support chunking.
    #[error("{name} cannot carry {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Name of the transport.
        name: String,
        /// Size of the payload that was rejected.
        size: usize,
        /// Maximum size this transport accepts.
        max: usize,
    },

    /// No registered transport matched the request (e.g. `send_best` with
    /// no transport currently available).
    #[error("no transport available")]
    NoTransportAvailable,

    /// A transport with this name is not registered on the manager.
    #[error("unknown transport: {name}")]
    UnknownTransport {
        /// Requested transport name.
        name: String,
    },
}

impl From<TransportError> for DmeshError {
    fn from(err: TransportError) -> Self {
        DmeshError::TransportError { reason: err.to_string() }
    }
}

impl From<dmesh_chunker::ChunkerError> for TransportError {
    fn from(err: dmesh_chunker::ChunkerError) -> Self {
        TransportError::Chunking { reason: err.to_string() }
    }
}
