//! Cryptographic, delay-tolerant, relay-agnostic emergency messaging.
//!
//! This crate re-exports the public API of every workspace member behind
//! one dependency, with no logic of its own, only the `pub use`s below.
//! An embedding application typically only depends on `dmesh`; the
//! individual `dmesh-*` crates remain independently usable for callers
//! that only need, say, the wire codec or the crypto core.
//!
//! ## Sealing and opening a message
//! ```no_run
//! use dmesh::{decrypt, encrypt, BoxKeyPair, EncryptRequest, PayloadContent, SenderPolicy, SigningKeyPair, ValidityMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sender_signing = SigningKeyPair::generate()?;
//! let sender_box = BoxKeyPair::generate();
//! let recipient_box = BoxKeyPair::generate();
//!
//! let envelope = encrypt(EncryptRequest {
//!     content: PayloadContent::Text { content: "help needed".to_string() },
//!     sender_signing: &sender_signing,
//!     sender_box: &sender_box,
//!     recipient_box_pk: &recipient_box.public_key_bytes(),
//!     ts: None,
//!     ttl_ms: None,
//! })?;
//!
//! let mut replay = dmesh::store::StoreReplayCheck(dmesh::store::MemoryStore::new());
//! let decrypted = decrypt(
//!     &envelope,
//!     &recipient_box,
//!     &SenderPolicy::TrustOnFirstUse,
//!     ValidityMode::DelayTolerant { now: 0 },
//!     &mut replay,
//! )?;
//! assert!(matches!(decrypted.payload.content, PayloadContent::Text { .. }));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Persistent collections: own-keys, contacts, outbox, inbox, seen,
/// forwarded, partial-chunks (`dmesh-store`).
pub mod store {
    pub use dmesh_store::{
        ChunkStore, Contact, CompleteSet, ContactsStore, DEFAULT_MAX_PARTIAL_BYTES_PER_MESSAGE,
        DecodedInboxRecord, ForwardedEntry, ForwardedStore, InboxEntry, InboxStore, MemoryStore,
        OutboxEntry, OutboxStatus, OutboxStore, OwnKeysRecord, OwnKeysStore, PartialChunkEntry,
        RedbStore, SeenEntry, SeenStore, Store, StoreError, StoreReplayCheck, StoreStats,
        VerificationState,
    };
}

/// Carrier adapters: clipboard, QR, file (`dmesh-transport`).
pub mod transport {
    #[cfg(feature = "clipboard")]
    pub use dmesh_transport::ClipboardTransport;
    pub use dmesh_transport::{
        Capabilities as TransportCapabilities, ChunkProgress, FileBlob, FileTransport,
        QrTransport, ReceivedFile, TaggedError, TaggedMessage, Transport, TransportError,
        TransportManager,
    };
}

/// The five-phase sync session engine (`dmesh-sync`).
pub mod sync {
    pub use dmesh_sync::{
        InventoryCandidate, Phase, PeerInfo, SessionRateLimiter, SyncAction, SyncConfig,
        SyncError, SyncFrame, SyncSession, priority_of, priority_of_type,
    };
}

// Wire codec (`dmesh-proto`).
pub use dmesh_proto::{
    Capabilities, Chunk, DataUnit, DecodedEnvelope, DmeshError, ErrorCategory, Fingerprint,
    InvItem, MessageEnvelope, MessageId, Payload, PayloadContent, PublicIdentity, SyncAck,
    SyncData, SyncGet, SyncHello, SyncInv, Urgency,
};

// Chunking and reassembly (`dmesh-chunker`).
pub use dmesh_chunker::{ChunkerError, chunk, reassemble};

// Cryptographic core (`dmesh-crypto`).
pub use dmesh_crypto::{
    BoxKeyPair, CryptoError, DecryptedMessage, EncryptRequest, EphemeralBoxKeyPair, ReplayCheck,
    SenderPolicy, SignFields, SigningKeyPair, ValidityMode, decrypt, derive_fingerprint,
    derive_message_id, encrypt, safety_number, sign_bytes, verify_signature,
};
