//! Store-layer error type and its conversion into the workspace-wide
//! [`dmesh_proto::DmeshError`].

use dmesh_proto::DmeshError;
use thiserror::Error;

/// Errors raised by `dmesh-store` operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested row does not exist in the named table.
    #[error("not found in {table}: {key}")]
    NotFound {
        /// Table the lookup was against.
        table: &'static str,
        /// The key that was not found.
        key: String,
    },

    /// A caller tried to change a contact's pinned key material silently
    /// instead of going through an explicit re-pin/compromise flow (spec
    /// §3 Contact invariant).
    #[error("contact {fingerprint} already recorded with different key material")]
    ContactKeyChanged {
        /// Base64 fingerprint of the contact.
        fingerprint: String,
    },

    /// The underlying storage engine (redb) failed.
    #[error("storage engine error: {reason}")]
    Engine {
        /// Underlying engine error, for diagnostics only.
        reason: String,
    },

    /// A stored value failed to (de)serialize.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Underlying error, for diagnostics only.
        reason: String,
    },
}

impl From<StoreError> for DmeshError {
    fn from(err: StoreError) -> Self {
        DmeshError::StorageError { reason: err.to_string() }
    }
}

// redb's transaction/table/storage error types are mapped at each call site
// with `.map_err(|e| StoreError::Engine { reason: e.to_string() })` rather
// than via `From` impls per error type.
