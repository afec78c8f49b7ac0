//! Errors raised by `chunk`/`reassemble`.

use thiserror::Error;

/// Errors raised when splitting or reassembling envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkerError {
    /// `max_chunk_size - CHUNK_OVERHEAD` was zero or negative.
    #[error("max chunk size {max_chunk_size} is too small for the {overhead}-byte overhead")]
    ChunkSizeTooSmall {
        /// The caller-supplied maximum chunk size.
        max_chunk_size: usize,
        /// The fixed per-chunk overhead subtracted from it.
        overhead: usize,
    },

    /// Fewer or more chunks were supplied than the declared `total`.
    #[error("incomplete chunk set: expected {expected}, got {got}")]
    IncompleteChunks {
        /// The `total` every chunk declared.
        expected: u32,
        /// The number of chunks actually supplied.
        got: u32,
    },

    /// A sequence number in `[0, total)` was not present among the supplied
    /// chunks.
    #[error("missing chunk sequence {seq}")]
    MissingSequence {
        /// The missing sequence number.
        seq: u32,
    },

    /// Not every chunk shared the same `msg_id`.
    #[error("chunk set contains mismatched message ids")]
    MessageIdMismatch,

    /// The reassembled bytes were not valid UTF-8, or did not parse back
    /// into an envelope.
    #[error("reassembled envelope is malformed: {reason}")]
    MalformedEnvelope {
        /// Human-readable description of what was wrong.
        reason: String,
    },
}
