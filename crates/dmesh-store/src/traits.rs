//! Per-collection store traits and the aggregate [`Store`] bound.
//!
//! Split into one trait per collection so callers that only need, say,
//! the seen-set (e.g. `dmesh-crypto`'s [`dmesh_crypto::ReplayCheck`] seam)
//! can depend on a narrower bound.

use dmesh_proto::MessageEnvelope;

use crate::error::StoreError;
use crate::models::{
    Contact, ForwardedEntry, InboxEntry, OutboxEntry, OutboxStatus, OwnKeysRecord,
    PartialChunkEntry, SeenEntry, StoreStats, VerificationState,
};

/// The result of inserting a chunk that completes its set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteSet {
    /// Base64-encoded message id the chunks reassemble to.
    pub msg_id: String,
    /// Chunk payload bytes, ordered by sequence number.
    pub ordered_data: Vec<Vec<u8>>,
}

/// This device's own long-term key material.
pub trait OwnKeysStore {
    /// Persist this device's own keys, overwriting any existing record.
    fn put_own_keys(&self, keys: OwnKeysRecord) -> Result<(), StoreError>;

    /// Load this device's own keys, if ever set.
    fn get_own_keys(&self) -> Result<Option<OwnKeysRecord>, StoreError>;

    /// Remove this device's own keys.
    fn delete_own_keys(&self) -> Result<(), StoreError>;
}

/// Recorded contacts and their trust state.
pub trait ContactsStore {
    /// Insert or update a contact.
    ///
    /// # Errors
    /// Returns [`StoreError::ContactKeyChanged`] if a contact with this
    /// fingerprint is already recorded with a *different* `signing_pk` or
    /// `box_pk`. Callers that intend to re-pin must go through
    /// [`Self::mark_compromised`] and delete first.
    fn save_contact(&self, contact: Contact) -> Result<(), StoreError>;

    /// Look up a contact by fingerprint.
    fn get_contact(&self, fingerprint: &str) -> Result<Option<Contact>, StoreError>;

    /// All recorded contacts, in no particular order.
    fn all_contacts(&self) -> Result<Vec<Contact>, StoreError>;

    /// Contacts currently in the given trust state.
    fn contacts_where(&self, verification: VerificationState) -> Result<Vec<Contact>, StoreError>;

    /// Mark a contact [`VerificationState::Verified`].
    fn verify_contact(&self, fingerprint: &str) -> Result<(), StoreError>;

    /// Mark a contact [`VerificationState::Compromised`].
    fn mark_compromised(&self, fingerprint: &str, reason: Option<String>) -> Result<(), StoreError>;

    /// Remove a contact entirely.
    fn delete_contact(&self, fingerprint: &str) -> Result<(), StoreError>;
}

/// Messages queued for outbound sync.
pub trait OutboxStore {
    /// Queue a sealed envelope for a recipient under the given message id.
    ///
    /// The id is taken explicitly rather than read from `envelope.msg_id`
    /// because that field is optional on the wire (absent on pure v1.0
    /// envelopes); callers always know it already, having just computed it
    /// via [`dmesh_crypto::derive_message_id`] when building the envelope.
    fn add(&self, msg_id: String, envelope: MessageEnvelope, recipient_fp: String) -> Result<(), StoreError>;

    /// All entries still [`OutboxStatus::Pending`].
    fn pending(&self) -> Result<Vec<OutboxEntry>, StoreError>;

    /// All entries queued for a given recipient, regardless of status.
    fn for_recipient(&self, fp: &str) -> Result<Vec<OutboxEntry>, StoreError>;

    /// Transition an entry's delivery status.
    fn update_status(&self, msg_id: &str, status: OutboxStatus) -> Result<(), StoreError>;

    /// Remove an entry (e.g. after final delivery confirmation).
    fn remove(&self, msg_id: &str) -> Result<(), StoreError>;
}

/// Messages received and decrypted by this device.
pub trait InboxStore {
    /// Record a decrypted message alongside its original envelope.
    fn add(&self, decrypted: &DecodedInboxRecord, envelope: MessageEnvelope) -> Result<(), StoreError>;

    /// All messages, most recently received first.
    fn all(&self) -> Result<Vec<InboxEntry>, StoreError>;

    /// Messages not yet marked read.
    fn unread(&self) -> Result<Vec<InboxEntry>, StoreError>;

    /// Messages from a given sender.
    fn from_sender(&self, fp: &str) -> Result<Vec<InboxEntry>, StoreError>;

    /// Messages whose payload is of the given wire type (e.g. `"text"`).
    fn by_type(&self, payload_type: &str) -> Result<Vec<InboxEntry>, StoreError>;

    /// Mark a message read.
    fn mark_read(&self, msg_id: &str) -> Result<(), StoreError>;

    /// Remove a message.
    fn delete(&self, msg_id: &str) -> Result<(), StoreError>;
}

/// The fields [`InboxStore::add`] needs from a freshly decrypted message,
/// decoupled from `dmesh-crypto`'s own `DecryptedMessage` type so this crate
/// does not need a one-to-one mapping to it.
#[derive(Debug, Clone)]
pub struct DecodedInboxRecord {
    /// Base64-encoded message id.
    pub msg_id: String,
    /// Base64-encoded sender fingerprint.
    pub sender_fp: String,
    /// The decoded plaintext payload.
    pub payload: dmesh_proto::Payload,
    /// Wire `type` discriminant of the payload content.
    pub payload_type: String,
    /// Envelope creation time, Unix milliseconds.
    pub ts: u64,
    /// Time this device finished decrypting the message, Unix milliseconds.
    pub received_at: u64,
}

/// The replay-prevention dedup set.
///
/// `check_and_mark` backs [`dmesh_crypto::ReplayCheck`] via the adapter in
/// [`crate::replay`].
pub trait SeenStore {
    /// Atomically test-and-set: if `(msg_id, sender_fp)` has not been seen
    /// before, record it and return `Ok(true)`; if it has, return
    /// `Ok(false)` without modifying anything. Implementations MUST perform
    /// this as one indivisible operation.
    fn check_and_mark(&self, msg_id: &str, sender_fp: &str) -> Result<bool, StoreError>;

    /// Non-mutating membership test.
    fn has(&self, msg_id: &str, sender_fp: &str) -> Result<bool, StoreError>;

    /// Remove entries older than `max_age_ms`, returning a timestamp to
    /// compare `seen_at` against is left to the implementation's own clock.
    fn cleanup(&self, max_age_ms: u64) -> Result<usize, StoreError>;

    /// Raw contents, for [`crate::Store::stats`] and tests.
    fn all_seen(&self) -> Result<Vec<SeenEntry>, StoreError>;
}

/// Per-peer record of which messages have already been offered, used to
/// suppress redundant re-sends during sync.
pub trait ForwardedStore {
    /// Record that `msg_id` has been forwarded to `peer_fp`.
    fn mark_forwarded(&self, peer_fp: &str, msg_id: &str) -> Result<(), StoreError>;

    /// Whether `msg_id` has already been forwarded to `peer_fp`.
    fn was_forwarded(&self, peer_fp: &str, msg_id: &str) -> Result<bool, StoreError>;

    /// All message ids forwarded to a given peer.
    fn forwarded_to(&self, peer_fp: &str) -> Result<Vec<String>, StoreError>;

    /// Remove entries older than `max_age_ms`.
    fn cleanup(&self, max_age_ms: u64) -> Result<usize, StoreError>;
}

/// Buffered chunks awaiting a complete set for reassembly.
pub trait ChunkStore {
    /// Insert a chunk. If its set is now complete, remove the partial
    /// entries and return them in sequence order for reassembly.
    fn store(&self, entry: PartialChunkEntry) -> Result<Option<CompleteSet>, StoreError>;

    /// Remove chunks older than `max_age_ms` (default: 24 hours, see
    /// [`dmesh_proto::PARTIAL_CHUNK_MAX_AGE_MS`]).
    fn cleanup(&self, max_age_ms: u64) -> Result<usize, StoreError>;

    /// Number of buffered chunks, across all in-progress sets.
    fn partial_count(&self) -> Result<usize, StoreError>;
}

/// The full collection of stores an embedding application depends on.
///
/// A `Clone + Send + Sync + 'static` marker over every per-collection
/// trait. Implementors provide [`Self::stats`] directly since each
/// backend knows its own cheapest way to count rows.
pub trait Store:
    OwnKeysStore
    + ContactsStore
    + OutboxStore
    + InboxStore
    + SeenStore
    + ForwardedStore
    + ChunkStore
    + Clone
    + Send
    + Sync
    + 'static
{
    /// Run the two required maintenance sweeps: seen-set retention and
    /// partial-chunk expiry.
    fn run_maintenance(&self) -> Result<(), StoreError> {
        let seen_dropped = SeenStore::cleanup(self, dmesh_proto::SEEN_RETENTION_MS)?;
        let chunks_dropped = ChunkStore::cleanup(self, dmesh_proto::PARTIAL_CHUNK_MAX_AGE_MS)?;
        tracing::debug!(seen_dropped, chunks_dropped, "maintenance sweep complete");
        Ok(())
    }

    /// Row counts per table.
    fn stats(&self) -> Result<StoreStats, StoreError>;
}
