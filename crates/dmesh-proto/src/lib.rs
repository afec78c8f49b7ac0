//! Wire codec and primitives for the dmesh protocol.
//!
//! Canonical JSON envelopes for identity, message, chunk, and sync frames;
//! base64 for byte fields; exact big-endian byte builders for the
//! `SignBytes` construction; and the stable error taxonomy every other
//! crate in the workspace surfaces to callers.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chunk;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod payload;
pub mod primitives;
pub mod sync_frames;

pub use chunk::Chunk;
pub use constants::*;
pub use envelope::{DecodedEnvelope, MessageEnvelope};
pub use error::{DmeshError, ErrorCategory};
pub use identity::PublicIdentity;
pub use payload::{Payload, PayloadContent, Urgency};
pub use sync_frames::{Capabilities, DataUnit, InvItem, SyncAck, SyncData, SyncGet, SyncHello, SyncInv};

/// A 16-byte party fingerprint: `SHA-512(signing_pk)[0..16]`.
pub type Fingerprint = [u8; constants::FINGERPRINT_LEN];

/// A 32-byte message identifier: `SHA-512(ciphertext)[0..32]`.
pub type MessageId = [u8; constants::MESSAGE_ID_LEN];
