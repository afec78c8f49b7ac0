//! Row types for the seven persistent collections.

use dmesh_proto::{Chunk, MessageEnvelope, Payload};
use serde::{Deserialize, Serialize};

/// Raw long-term key material for this device's own identity.
///
/// `dmesh-crypto`'s `SigningKeyPair`/`BoxKeyPair` intentionally do not
/// implement `Serialize`/`Clone` (secret material should not move through
/// generic serialization paths by accident); this record is the one place
/// the core explicitly opts into persisting that material, and callers
/// opt into using this table explicitly.
#[derive(Clone, Serialize, Deserialize)]
pub struct OwnKeysRecord {
    /// 32-byte Ed25519 public key.
    pub sign_pk: [u8; 32],
    /// 64-byte Ed25519 secret key (seed + public key).
    pub sign_sk: [u8; 64],
    /// 32-byte X25519 public key.
    pub box_pk: [u8; 32],
    /// 32-byte X25519 secret scalar.
    pub box_sk: [u8; 32],
}

impl Drop for OwnKeysRecord {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.sign_sk.zeroize();
        self.box_sk.zeroize();
    }
}

/// Trust state of a [`Contact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationState {
    /// Accepted via TOFU; never out-of-band confirmed.
    Unverified,
    /// Confirmed out-of-band (e.g. matching safety number).
    Verified,
    /// Flagged as compromised; callers should warn before trusting further
    /// messages from this fingerprint.
    Compromised,
}

/// A recorded contact's identity and trust state.
///
/// Primary key: `fingerprint`. Once recorded, `(signing_pk, box_pk)` for a
/// given fingerprint must not change silently. [`super::ContactsStore::save_contact`]
/// enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// 16-byte fingerprint, base64-encoded for use as a map/table key.
    pub fingerprint: String,
    /// Base64-encoded Ed25519 signing public key.
    pub signing_pk: String,
    /// Base64-encoded X25519 box public key.
    pub box_pk: String,
    /// Locally chosen display name.
    pub display_name: String,
    /// Current trust state.
    pub verification: VerificationState,
    /// When this contact was first recorded, Unix milliseconds.
    pub added_at: u64,
    /// When this contact's record was last modified, Unix milliseconds.
    pub updated_at: u64,
    /// When this contact was marked [`VerificationState::Verified`], if ever.
    pub verified_at: Option<u64>,
    /// When this contact was marked [`VerificationState::Compromised`], if ever.
    pub compromised_at: Option<u64>,
    /// Caller-supplied reason for the compromise flag.
    pub compromised_reason: Option<String>,
}

/// Delivery state of an [`OutboxEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    /// Not yet handed to any sync session.
    Pending,
    /// Offered to at least one peer during a sync session.
    Sent,
    /// Confirmed received by all known recipients (ACKed).
    Delivered,
    /// Abandoned after exceeding the caller's retry policy.
    Failed,
}

/// A message this device has queued to send.
///
/// Primary key: `msg_id`. Indexed on `status` and `recipient_fp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Base64-encoded message id.
    pub msg_id: String,
    /// Base64-encoded fingerprint of the intended recipient.
    pub recipient_fp: String,
    /// The sealed envelope to (re)send.
    pub message_envelope: MessageEnvelope,
    /// When this entry was queued, Unix milliseconds.
    pub created_at: u64,
    /// Current delivery status.
    pub status: OutboxStatus,
    /// Number of sync sessions that have offered this message.
    pub attempts: u32,
    /// Timestamp of the most recent send attempt, if any.
    pub last_attempt: Option<u64>,
}

/// A message this device has received and decrypted.
///
/// Primary key: `msg_id`. Indices on `sender_fp`, `payload_type`, `read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxEntry {
    /// Base64-encoded message id.
    pub msg_id: String,
    /// Base64-encoded fingerprint of the sender.
    pub sender_fp: String,
    /// The decoded plaintext payload.
    pub payload: Payload,
    /// Wire `type` discriminant of `payload.content` (e.g. `"text"`), kept
    /// denormalized for the `by_type` index.
    pub payload_type: String,
    /// Envelope creation time, Unix milliseconds.
    pub ts: u64,
    /// When this device received and decrypted the message, Unix milliseconds.
    pub received_at: u64,
    /// Whether the embedding application has marked this message read.
    pub read: bool,
    /// The original sealed envelope, kept for re-verification or forwarding.
    pub original_envelope: MessageEnvelope,
}

/// A dedup record for a `(msg_id, sender_fp)` pair that has already been
/// successfully decrypted.
///
/// Key: `"{msg_id}:{sender_fp}"`. Retention: [`dmesh_proto::SEEN_RETENTION_MS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeenEntry {
    /// Base64-encoded message id.
    pub msg_id: String,
    /// Base64-encoded sender fingerprint.
    pub sender_fp: String,
    /// When this pair was first marked seen, Unix milliseconds.
    pub seen_at: u64,
}

impl SeenEntry {
    /// The composite key this entry is stored under: `"msg_id:sender_fp"`.
    pub fn key(msg_id: &str, sender_fp: &str) -> String {
        format!("{msg_id}:{sender_fp}")
    }
}

/// A record that a given peer has already received a given message, used by
/// the sync engine to suppress redundant re-offers.
///
/// Key: `"{peer_fp}:{msg_id}"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardedEntry {
    /// Base64-encoded fingerprint of the peer this message was forwarded to.
    pub peer_fp: String,
    /// Base64-encoded message id.
    pub msg_id: String,
    /// When the forwarding ACK was recorded, Unix milliseconds.
    pub forwarded_at: u64,
}

impl ForwardedEntry {
    /// The composite key this entry is stored under: `"peer_fp:msg_id"`.
    pub fn key(peer_fp: &str, msg_id: &str) -> String {
        format!("{peer_fp}:{msg_id}")
    }
}

/// One chunk of an in-progress reassembly, buffered until its full set
/// arrives.
///
/// Key: `"{msg_id}:{seq}"`. Indexed on `msg_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialChunkEntry {
    /// Base64-encoded message id this chunk belongs to.
    pub msg_id: String,
    /// Zero-based sequence number within the set.
    pub seq: u32,
    /// Total number of chunks the set declares.
    pub total: u32,
    /// Raw chunk payload bytes (already base64-decoded from the wire chunk).
    pub data: Vec<u8>,
    /// When this chunk arrived, Unix milliseconds.
    pub received_at: u64,
}

impl PartialChunkEntry {
    /// The composite key this entry is stored under: `"msg_id:seq"`.
    pub fn key(msg_id: &str, seq: u32) -> String {
        format!("{msg_id}:{seq}")
    }

    /// Rebuild a wire [`Chunk`] from this buffered entry.
    pub fn to_wire_chunk(&self) -> Chunk {
        Chunk {
            v: 1,
            kind: Chunk::KIND.to_string(),
            msg_id: self.msg_id.clone(),
            seq: self.seq,
            total: self.total,
            data: dmesh_proto::primitives::b64_encode(&self.data),
        }
    }
}

/// Per-table row counts, returned by [`super::Store::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of recorded contacts.
    pub contacts: usize,
    /// Number of outbox entries.
    pub outbox: usize,
    /// Number of inbox entries.
    pub inbox: usize,
    /// Number of seen-set entries.
    pub seen: usize,
    /// Number of forwarded-set entries.
    pub forwarded: usize,
    /// Number of buffered partial chunks (not grouped by message).
    pub partial_chunks: usize,
}
