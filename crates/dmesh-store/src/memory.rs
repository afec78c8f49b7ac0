//! In-memory [`Store`] implementation for tests and embedding applications
//! that do not need durability.
//!
//! One inner struct behind a single `Mutex`, wrapped in `Arc` so handles
//! are cheap to `Clone` and share across threads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dmesh_proto::MessageEnvelope;

use crate::error::StoreError;
use crate::models::{
    Contact, ForwardedEntry, InboxEntry, OutboxEntry, OutboxStatus, OwnKeysRecord,
    PartialChunkEntry, SeenEntry, StoreStats, VerificationState,
};
use crate::traits::{
    ChunkStore, CompleteSet, ContactsStore, DecodedInboxRecord, ForwardedStore, InboxStore,
    OutboxStore, OwnKeysStore, SeenStore, Store,
};

#[derive(Default)]
struct Inner {
    own_keys: Option<OwnKeysRecord>,
    contacts: HashMap<String, Contact>,
    outbox: HashMap<String, OutboxEntry>,
    inbox: HashMap<String, InboxEntry>,
    seen: HashMap<String, SeenEntry>,
    forwarded: HashMap<String, ForwardedEntry>,
    partial_chunks: HashMap<String, PartialChunkEntry>,
}

/// An in-memory, non-durable [`Store`].
///
/// Cloning a handle shares the underlying table: the cheap "open a second
/// handle to the same database" pattern.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Open a fresh, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("MemoryStore mutex poisoned")
    }
}

impl OwnKeysStore for MemoryStore {
    fn put_own_keys(&self, keys: OwnKeysRecord) -> Result<(), StoreError> {
        self.lock().own_keys = Some(keys);
        Ok(())
    }

    fn get_own_keys(&self) -> Result<Option<OwnKeysRecord>, StoreError> {
        Ok(self.lock().own_keys.clone())
    }

    fn delete_own_keys(&self) -> Result<(), StoreError> {
        self.lock().own_keys = None;
        Ok(())
    }
}

impl ContactsStore for MemoryStore {
    fn save_contact(&self, contact: Contact) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(existing) = inner.contacts.get(&contact.fingerprint) {
            if existing.signing_pk != contact.signing_pk || existing.box_pk != contact.box_pk {
                return Err(StoreError::ContactKeyChanged {
                    fingerprint: contact.fingerprint,
                });
            }
        }
        inner.contacts.insert(contact.fingerprint.clone(), contact);
        Ok(())
    }

    fn get_contact(&self, fingerprint: &str) -> Result<Option<Contact>, StoreError> {
        Ok(self.lock().contacts.get(fingerprint).cloned())
    }

    fn all_contacts(&self) -> Result<Vec<Contact>, StoreError> {
        Ok(self.lock().contacts.values().cloned().collect())
    }

    fn contacts_where(&self, verification: VerificationState) -> Result<Vec<Contact>, StoreError> {
        Ok(self
            .lock()
            .contacts
            .values()
            .filter(|c| c.verification == verification)
            .cloned()
            .collect())
    }

    fn verify_contact(&self, fingerprint: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let contact = inner
            .contacts
            .get_mut(fingerprint)
            .ok_or_else(|| StoreError::NotFound {
                table: "contacts",
                key: fingerprint.to_string(),
            })?;
        contact.verification = VerificationState::Verified;
        contact.verified_at = Some(crate::time::now_ms());
        contact.updated_at = contact.verified_at.unwrap_or_default();
        Ok(())
    }

    fn mark_compromised(&self, fingerprint: &str, reason: Option<String>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let contact = inner
            .contacts
            .get_mut(fingerprint)
            .ok_or_else(|| StoreError::NotFound {
                table: "contacts",
                key: fingerprint.to_string(),
            })?;
        contact.verification = VerificationState::Compromised;
        let now = crate::time::now_ms();
        contact.compromised_at = Some(now);
        contact.compromised_reason = reason;
        contact.updated_at = now;
        Ok(())
    }

    fn delete_contact(&self, fingerprint: &str) -> Result<(), StoreError> {
        self.lock().contacts.remove(fingerprint);
        Ok(())
    }
}

impl OutboxStore for MemoryStore {
    fn add(&self, msg_id: String, envelope: MessageEnvelope, recipient_fp: String) -> Result<(), StoreError> {
        let entry = OutboxEntry {
            msg_id: msg_id.clone(),
            recipient_fp,
            message_envelope: envelope,
            created_at: crate::time::now_ms(),
            status: OutboxStatus::Pending,
            attempts: 0,
            last_attempt: None,
        };
        self.lock().outbox.insert(msg_id, entry);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<OutboxEntry>, StoreError> {
        Ok(self
            .lock()
            .outbox
            .values()
            .filter(|e| e.status == OutboxStatus::Pending)
            .cloned()
            .collect())
    }

    fn for_recipient(&self, fp: &str) -> Result<Vec<OutboxEntry>, StoreError> {
        Ok(self
            .lock()
            .outbox
            .values()
            .filter(|e| e.recipient_fp == fp)
            .cloned()
            .collect())
    }

    fn update_status(&self, msg_id: &str, status: OutboxStatus) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .outbox
            .get_mut(msg_id)
            .ok_or_else(|| StoreError::NotFound {
                table: "outbox",
                key: msg_id.to_string(),
            })?;
        entry.status = status;
        entry.attempts += 1;
        entry.last_attempt = Some(crate::time::now_ms());
        Ok(())
    }

    fn remove(&self, msg_id: &str) -> Result<(), StoreError> {
        self.lock().outbox.remove(msg_id);
        Ok(())
    }
}

impl InboxStore for MemoryStore {
    fn add(&self, decrypted: &DecodedInboxRecord, envelope: MessageEnvelope) -> Result<(), StoreError> {
        let entry = InboxEntry {
            msg_id: decrypted.msg_id.clone(),
            sender_fp: decrypted.sender_fp.clone(),
            payload: decrypted.payload.clone(),
            payload_type: decrypted.payload_type.clone(),
            ts: decrypted.ts,
            received_at: decrypted.received_at,
            read: false,
            original_envelope: envelope,
        };
        self.lock().inbox.insert(entry.msg_id.clone(), entry);
        Ok(())
    }

    fn all(&self) -> Result<Vec<InboxEntry>, StoreError> {
        let mut entries: Vec<InboxEntry> = self.lock().inbox.values().cloned().collect();
        entries.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(entries)
    }

    fn unread(&self) -> Result<Vec<InboxEntry>, StoreError> {
        Ok(self
            .lock()
            .inbox
            .values()
            .filter(|e| !e.read)
            .cloned()
            .collect())
    }

    fn from_sender(&self, fp: &str) -> Result<Vec<InboxEntry>, StoreError> {
        Ok(self
            .lock()
            .inbox
            .values()
            .filter(|e| e.sender_fp == fp)
            .cloned()
            .collect())
    }

    fn by_type(&self, payload_type: &str) -> Result<Vec<InboxEntry>, StoreError> {
        Ok(self
            .lock()
            .inbox
            .values()
            .filter(|e| e.payload_type == payload_type)
            .cloned()
            .collect())
    }

    fn mark_read(&self, msg_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .inbox
            .get_mut(msg_id)
            .ok_or_else(|| StoreError::NotFound {
                table: "inbox",
                key: msg_id.to_string(),
            })?;
        entry.read = true;
        Ok(())
    }

    fn delete(&self, msg_id: &str) -> Result<(), StoreError> {
        self.lock().inbox.remove(msg_id);
        Ok(())
    }
}

impl SeenStore for MemoryStore {
    fn check_and_mark(&self, msg_id: &str, sender_fp: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let key = SeenEntry::key(msg_id, sender_fp);
        if inner.seen.contains_key(&key) {
            return Ok(false);
        }
        inner.seen.insert(
            key,
            SeenEntry {
                msg_id: msg_id.to_string(),
                sender_fp: sender_fp.to_string(),
                seen_at: crate::time::now_ms(),
            },
        );
        Ok(true)
    }

    fn has(&self, msg_id: &str, sender_fp: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .seen
            .contains_key(&SeenEntry::key(msg_id, sender_fp)))
    }

    fn cleanup(&self, max_age_ms: u64) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let now = crate::time::now_ms();
        let before = inner.seen.len();
        inner
            .seen
            .retain(|_, e| now.saturating_sub(e.seen_at) <= max_age_ms);
        Ok(before - inner.seen.len())
    }

    fn all_seen(&self) -> Result<Vec<SeenEntry>, StoreError> {
        Ok(self.lock().seen.values().cloned().collect())
    }
}

impl ForwardedStore for MemoryStore {
    fn mark_forwarded(&self, peer_fp: &str, msg_id: &str) -> Result<(), StoreError> {
        let key = ForwardedEntry::key(peer_fp, msg_id);
        self.lock().forwarded.insert(
            key,
            ForwardedEntry {
                peer_fp: peer_fp.to_string(),
                msg_id: msg_id.to_string(),
                forwarded_at: crate::time::now_ms(),
            },
        );
        Ok(())
    }

    fn was_forwarded(&self, peer_fp: &str, msg_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .forwarded
            .contains_key(&ForwardedEntry::key(peer_fp, msg_id)))
    }

    fn forwarded_to(&self, peer_fp: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()
            .forwarded
            .values()
            .filter(|e| e.peer_fp == peer_fp)
            .map(|e| e.msg_id.clone())
            .collect())
    }

    fn cleanup(&self, max_age_ms: u64) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let now = crate::time::now_ms();
        let before = inner.forwarded.len();
        inner
            .forwarded
            .retain(|_, e| now.saturating_sub(e.forwarded_at) <= max_age_ms);
        Ok(before - inner.forwarded.len())
    }
}

/// Default bound on buffered bytes per in-progress chunk set, generously
/// above the largest named transport chunk size. Bounds how much an
/// adversary can grow the partial-chunk store by injecting garbage
/// fragments under one `msg_id`.
pub const DEFAULT_MAX_PARTIAL_BYTES_PER_MESSAGE: usize = 4 * dmesh_proto::MAX_BYTES;

impl ChunkStore for MemoryStore {
    fn store(&self, entry: PartialChunkEntry) -> Result<Option<CompleteSet>, StoreError> {
        let mut inner = self.lock();
        let msg_id = entry.msg_id.clone();
        let total = entry.total;
        let key = PartialChunkEntry::key(&entry.msg_id, entry.seq);
        inner.partial_chunks.insert(key, entry);

        let set_bytes: usize = inner
            .partial_chunks
            .values()
            .filter(|e| e.msg_id == msg_id)
            .map(|e| e.data.len())
            .sum();
        if set_bytes > DEFAULT_MAX_PARTIAL_BYTES_PER_MESSAGE {
            let mut oldest_key: Option<(String, u64)> = None;
            for (k, e) in inner.partial_chunks.iter().filter(|(_, e)| e.msg_id == msg_id) {
                if oldest_key.as_ref().is_none_or(|(_, t)| e.received_at < *t) {
                    oldest_key = Some((k.clone(), e.received_at));
                }
            }
            if let Some((k, _)) = oldest_key {
                inner.partial_chunks.remove(&k);
            }
        }

        let have: Vec<&PartialChunkEntry> = inner
            .partial_chunks
            .values()
            .filter(|e| e.msg_id == msg_id)
            .collect();
        if have.len() as u32 != total {
            return Ok(None);
        }
        let mut ordered: Vec<(u32, Vec<u8>)> =
            have.into_iter().map(|e| (e.seq, e.data.clone())).collect();
        ordered.sort_by_key(|(seq, _)| *seq);
        if ordered.iter().enumerate().any(|(i, (seq, _))| *seq != i as u32) {
            return Ok(None);
        }

        inner
            .partial_chunks
            .retain(|_, e| e.msg_id != msg_id);

        Ok(Some(CompleteSet {
            msg_id,
            ordered_data: ordered.into_iter().map(|(_, data)| data).collect(),
        }))
    }

    fn cleanup(&self, max_age_ms: u64) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let now = crate::time::now_ms();
        let before = inner.partial_chunks.len();
        inner
            .partial_chunks
            .retain(|_, e| now.saturating_sub(e.received_at) <= max_age_ms);
        Ok(before - inner.partial_chunks.len())
    }

    fn partial_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock().partial_chunks.len())
    }
}

impl Store for MemoryStore {
    fn stats(&self) -> Result<StoreStats, StoreError> {
        let inner = self.lock();
        Ok(StoreStats {
            contacts: inner.contacts.len(),
            outbox: inner.outbox.len(),
            inbox: inner.inbox.len(),
            seen: inner.seen.len(),
            forwarded: inner.forwarded.len(),
            partial_chunks: inner.partial_chunks.len(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dmesh_proto::{Payload, PayloadContent};

    fn envelope(msg_id: &str) -> MessageEnvelope {
        MessageEnvelope {
            v: 1,
            kind: "dmesh-msg".to_string(),
            msg_id: Some(msg_id.to_string()),
            ts: 0,
            exp: None,
            sender_sign_pk: "x".to_string(),
            sender_box_pk: "x".to_string(),
            recipient_box_pk: "x".to_string(),
            eph_pk: "x".to_string(),
            nonce: "x".to_string(),
            ciphertext: "x".to_string(),
            signature: "x".to_string(),
        }
    }

    fn contact(fp: &str) -> Contact {
        Contact {
            fingerprint: fp.to_string(),
            signing_pk: "sk".to_string(),
            box_pk: "bk".to_string(),
            display_name: "alice".to_string(),
            verification: VerificationState::Unverified,
            added_at: 1,
            updated_at: 1,
            verified_at: None,
            compromised_at: None,
            compromised_reason: None,
        }
    }

    #[test]
    fn contact_key_change_is_rejected() {
        let store = MemoryStore::new();
        store.save_contact(contact("fp1")).unwrap();
        let mut changed = contact("fp1");
        changed.box_pk = "different".to_string();
        let err = store.save_contact(changed).unwrap_err();
        assert!(matches!(err, StoreError::ContactKeyChanged { .. }));
    }

    #[test]
    fn seen_check_and_mark_is_one_shot() {
        let store = MemoryStore::new();
        assert!(store.check_and_mark("m1", "s1").unwrap());
        assert!(!store.check_and_mark("m1", "s1").unwrap());
        assert!(store.has("m1", "s1").unwrap());
    }

    #[test]
    fn outbox_roundtrip() {
        let store = MemoryStore::new();
        store.add("m1".to_string(), envelope("m1"), "r1".to_string()).unwrap();
        assert_eq!(store.pending().unwrap().len(), 1);
        store.update_status("m1", OutboxStatus::Sent).unwrap();
        assert_eq!(store.pending().unwrap().len(), 0);
        assert_eq!(store.for_recipient("r1").unwrap().len(), 1);
    }

    #[test]
    fn inbox_sorted_by_received_at_desc() {
        let store = MemoryStore::new();
        let payload = Payload {
            v: 1,
            ts: 0,
            content: PayloadContent::Text { content: "hi".to_string() },
        };
        for (id, received_at) in [("m1", 10u64), ("m2", 20u64)] {
            store
                .add(
                    &DecodedInboxRecord {
                        msg_id: id.to_string(),
                        sender_fp: "s1".to_string(),
                        payload: payload.clone(),
                        payload_type: "text".to_string(),
                        ts: 0,
                        received_at,
                    },
                    envelope(id),
                )
                .unwrap();
        }
        let all = store.all().unwrap();
        assert_eq!(all[0].msg_id, "m2");
        assert_eq!(all[1].msg_id, "m1");
    }

    #[test]
    fn chunk_store_completes_in_order() {
        let store = MemoryStore::new();
        assert!(store
            .store(PartialChunkEntry {
                msg_id: "m1".to_string(),
                seq: 1,
                total: 2,
                data: b"world".to_vec(),
                received_at: 2,
            })
            .unwrap()
            .is_none());
        let complete = store
            .store(PartialChunkEntry {
                msg_id: "m1".to_string(),
                seq: 0,
                total: 2,
                data: b"hello".to_vec(),
                received_at: 1,
            })
            .unwrap()
            .expect("set should now be complete");
        assert_eq!(complete.ordered_data, vec![b"hello".to_vec(), b"world".to_vec()]);
        assert_eq!(store.partial_count().unwrap(), 0);
    }

    #[test]
    fn forwarded_marks_are_per_peer() {
        let store = MemoryStore::new();
        store.mark_forwarded("peer1", "m1").unwrap();
        assert!(store.was_forwarded("peer1", "m1").unwrap());
        assert!(!store.was_forwarded("peer2", "m1").unwrap());
    }

    #[test]
    fn stats_counts_every_table() {
        let store = MemoryStore::new();
        store.save_contact(contact("fp1")).unwrap();
        store.add("m1".to_string(), envelope("m1"), "r1".to_string()).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.contacts, 1);
        assert_eq!(stats.outbox, 1);
    }
}
