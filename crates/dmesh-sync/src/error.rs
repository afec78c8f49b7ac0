//! Sync-session error type and its conversion into the workspace-wide
//! [`dmesh_proto::DmeshError`].
//!
//! Every variant here is a reason a session aborts: format errors on an
//! inbound sync frame abort the session with no writes.
//! `dmesh-sync` never retries internally; a fresh [`crate::SyncSession`] is
//! the caller's retry mechanism.

use dmesh_proto::DmeshError;
use thiserror::Error;

/// Errors that abort a sync session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A frame's `v`/`kind` tag, or its shape, did not match what this
    /// phase of the session expects.
    #[error("invalid frame: {reason}")]
    InvalidFrame {
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// A frame arrived whose phase does not follow the session's current
    /// state.
    #[error("unexpected frame for session state {state}")]
    UnexpectedFrame {
        /// Debug-formatted session state at the time of the violation.
        state: String,
    },

    /// A frame's Ed25519 signature did not verify against the claimed
    /// `peer_sign_pk`.
    #[error("sync frame signature invalid")]
    SignatureInvalid,

    /// A `sync-hello`'s `peer_fp` did not equal `fingerprint(peer_sign_pk)`.
    #[error("hello fingerprint does not match signing key")]
    FingerprintMismatch,

    /// A frame declared more items/messages/bytes than this session's
    /// configured or peer-advertised limits allow.
    #[error("{field} limit exceeded: {actual} > {limit}")]
    LimitExceeded {
        /// Which limit was exceeded (`"items"`, `"messages"`, `"bytes"`).
        field: &'static str,
        /// The observed count or byte total.
        actual: usize,
        /// The configured or advertised limit.
        limit: usize,
    },

    /// This peer has opened more sessions than the configured rate limit
    /// allows within the current window.
    #[error("rate limit exceeded for peer: {count} sessions in window")]
    RateLimited {
        /// Number of sessions already recorded for this peer in the window.
        count: u32,
    },

    /// A chunk or envelope inside a `sync-data` frame failed to reassemble.
    #[error("reassembly failed: {reason}")]
    ReassemblyFailed {
        /// Underlying chunker error, for diagnostics only.
        reason: String,
    },
}

impl From<SyncError> for DmeshError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::SignatureInvalid => DmeshError::SignatureInvalid,
            SyncError::FingerprintMismatch => {
                DmeshError::InvalidMessageFormat { reason: "hello fingerprint mismatch".to_string() }
            },
            other => DmeshError::InvalidMessageFormat { reason: other.to_string() },
        }
    }
}
