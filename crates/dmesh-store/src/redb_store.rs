//! Durable [`Store`] backed by `redb`.
//!
//! One `TableDefinition` per collection, `Arc<Database>` for cheap
//! `Clone`, and errors collapsed to a single string at each call site
//! rather than matched variant-by-variant. Row values are JSON, since
//! every other wire type in this workspace (`dmesh-proto`) is already
//! JSON and pulling in a second serialization format for this one crate
//! would not pay for itself.

use std::path::Path;
use std::sync::Arc;

use dmesh_proto::MessageEnvelope;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;
use crate::models::{
    Contact, ForwardedEntry, InboxEntry, OutboxEntry, OutboxStatus, OwnKeysRecord,
    PartialChunkEntry, SeenEntry, StoreStats, VerificationState,
};
use crate::traits::{
    ChunkStore, CompleteSet, ContactsStore, DecodedInboxRecord, ForwardedStore, InboxStore,
    OutboxStore, OwnKeysStore, SeenStore, Store,
};

const OWN_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("own_keys");
const CONTACTS: TableDefinition<&str, &[u8]> = TableDefinition::new("contacts");
const OUTBOX: TableDefinition<&str, &[u8]> = TableDefinition::new("outbox");
const INBOX: TableDefinition<&str, &[u8]> = TableDefinition::new("inbox");
const SEEN: TableDefinition<&str, &[u8]> = TableDefinition::new("seen");
const FORWARDED: TableDefinition<&str, &[u8]> = TableDefinition::new("forwarded");
const PARTIAL_CHUNKS: TableDefinition<&str, &[u8]> = TableDefinition::new("partial_chunks");

const OWN_KEYS_ROW: &str = "own";

fn engine_err<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Engine { reason: e.to_string() }
}

fn ser<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization { reason: e.to_string() })
}

fn de<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization { reason: e.to_string() })
}

/// Durable storage backed by `redb`.
///
/// Thread-safe through redb's own locking; `Clone` is cheap (`Arc`).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a database at the given path, creating every table
    /// that does not yet exist.
    ///
    /// # Errors
    /// Returns [`StoreError::Engine`] if the database cannot be opened or
    /// its tables cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(engine_err)?;
        let txn = db.begin_write().map_err(engine_err)?;
        {
            let _ = txn.open_table(OWN_KEYS).map_err(engine_err)?;
            let _ = txn.open_table(CONTACTS).map_err(engine_err)?;
            let _ = txn.open_table(OUTBOX).map_err(engine_err)?;
            let _ = txn.open_table(INBOX).map_err(engine_err)?;
            let _ = txn.open_table(SEEN).map_err(engine_err)?;
            let _ = txn.open_table(FORWARDED).map_err(engine_err)?;
            let _ = txn.open_table(PARTIAL_CHUNKS).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl OwnKeysStore for RedbStore {
    fn put_own_keys(&self, keys: OwnKeysRecord) -> Result<(), StoreError> {
        let bytes = ser(&keys)?;
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(OWN_KEYS).map_err(engine_err)?;
            table
                .insert(OWN_KEYS_ROW, bytes.as_slice())
                .map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }

    fn get_own_keys(&self) -> Result<Option<OwnKeysRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(OWN_KEYS).map_err(engine_err)?;
        match table.get(OWN_KEYS_ROW).map_err(engine_err)? {
            Some(row) => Ok(Some(de(row.value())?)),
            None => Ok(None),
        }
    }

    fn delete_own_keys(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(OWN_KEYS).map_err(engine_err)?;
            table.remove(OWN_KEYS_ROW).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }
}

impl ContactsStore for RedbStore {
    fn save_contact(&self, contact: Contact) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(CONTACTS).map_err(engine_err)?;
            if let Some(row) = table.get(contact.fingerprint.as_str()).map_err(engine_err)? {
                let existing: Contact = de(row.value())?;
                if existing.signing_pk != contact.signing_pk || existing.box_pk != contact.box_pk {
                    return Err(StoreError::ContactKeyChanged {
                        fingerprint: contact.fingerprint,
                    });
                }
            }
            let bytes = ser(&contact)?;
            table
                .insert(contact.fingerprint.as_str(), bytes.as_slice())
                .map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }

    fn get_contact(&self, fingerprint: &str) -> Result<Option<Contact>, StoreError> {
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(CONTACTS).map_err(engine_err)?;
        match table.get(fingerprint).map_err(engine_err)? {
            Some(row) => Ok(Some(de(row.value())?)),
            None => Ok(None),
        }
    }

    fn all_contacts(&self) -> Result<Vec<Contact>, StoreError> {
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(CONTACTS).map_err(engine_err)?;
        let mut out = Vec::new();
        for row in table.iter().map_err(engine_err)? {
            let (_, value) = row.map_err(engine_err)?;
            out.push(de(value.value())?);
        }
        Ok(out)
    }

    fn contacts_where(&self, verification: VerificationState) -> Result<Vec<Contact>, StoreError> {
        Ok(self
            .all_contacts()?
            .into_iter()
            .filter(|c| c.verification == verification)
            .collect())
    }

    fn verify_contact(&self, fingerprint: &str) -> Result<(), StoreError> {
        self.update_contact(fingerprint, |c| {
            c.verification = VerificationState::Verified;
            c.verified_at = Some(crate::time::now_ms());
            c.updated_at = c.verified_at.unwrap_or_default();
        })
    }

    fn mark_compromised(&self, fingerprint: &str, reason: Option<String>) -> Result<(), StoreError> {
        self.update_contact(fingerprint, |c| {
            c.verification = VerificationState::Compromised;
            let now = crate::time::now_ms();
            c.compromised_at = Some(now);
            c.compromised_reason = reason.clone();
            c.updated_at = now;
        })
    }

    fn delete_contact(&self, fingerprint: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(CONTACTS).map_err(engine_err)?;
            table.remove(fingerprint).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }
}

impl RedbStore {
    fn update_contact(
        &self,
        fingerprint: &str,
        f: impl FnOnce(&mut Contact),
    ) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(CONTACTS).map_err(engine_err)?;
            let mut contact: Contact = match table.get(fingerprint).map_err(engine_err)? {
                Some(row) => de(row.value())?,
                None => {
                    return Err(StoreError::NotFound {
                        table: "contacts",
                        key: fingerprint.to_string(),
                    });
                }
            };
            f(&mut contact);
            let bytes = ser(&contact)?;
            table.insert(fingerprint, bytes.as_slice()).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }
}

impl OutboxStore for RedbStore {
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
        let bytes = ser(&entry)?;
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(OUTBOX).map_err(engine_err)?;
            table.insert(msg_id.as_str(), bytes.as_slice()).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }

    fn pending(&self) -> Result<Vec<OutboxEntry>, StoreError> {
        Ok(self
            .all_outbox()?
            .into_iter()
            .filter(|e| e.status == OutboxStatus::Pending)
            .collect())
    }

    fn for_recipient(&self, fp: &str) -> Result<Vec<OutboxEntry>, StoreError> {
        Ok(self
            .all_outbox()?
            .into_iter()
            .filter(|e| e.recipient_fp == fp)
            .collect())
    }

    fn update_status(&self, msg_id: &str, status: OutboxStatus) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(OUTBOX).map_err(engine_err)?;
            let mut entry: OutboxEntry = match table.get(msg_id).map_err(engine_err)? {
                Some(row) => de(row.value())?,
                None => {
                    return Err(StoreError::NotFound {
                        table: "outbox",
                        key: msg_id.to_string(),
                    });
                }
            };
            entry.status = status;
            entry.attempts += 1;
            entry.last_attempt = Some(crate::time::now_ms());
            let bytes = ser(&entry)?;
            table.insert(msg_id, bytes.as_slice()).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }

    fn remove(&self, msg_id: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(OUTBOX).map_err(engine_err)?;
            table.remove(msg_id).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }
}

impl RedbStore {
    fn all_outbox(&self) -> Result<Vec<OutboxEntry>, StoreError> {
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(OUTBOX).map_err(engine_err)?;
        let mut out = Vec::new();
        for row in table.iter().map_err(engine_err)? {
            let (_, value) = row.map_err(engine_err)?;
            out.push(de(value.value())?);
        }
        Ok(out)
    }

    fn all_inbox(&self) -> Result<Vec<InboxEntry>, StoreError> {
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(INBOX).map_err(engine_err)?;
        let mut out = Vec::new();
        for row in table.iter().map_err(engine_err)? {
            let (_, value) = row.map_err(engine_err)?;
            out.push(de(value.value())?);
        }
        Ok(out)
    }
}

impl InboxStore for RedbStore {
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
        let bytes = ser(&entry)?;
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(INBOX).map_err(engine_err)?;
            table
                .insert(entry.msg_id.as_str(), bytes.as_slice())
                .map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<InboxEntry>, StoreError> {
        let mut entries = self.all_inbox()?;
        entries.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(entries)
    }

    fn unread(&self) -> Result<Vec<InboxEntry>, StoreError> {
        Ok(self.all_inbox()?.into_iter().filter(|e| !e.read).collect())
    }

    fn from_sender(&self, fp: &str) -> Result<Vec<InboxEntry>, StoreError> {
        Ok(self
            .all_inbox()?
            .into_iter()
            .filter(|e| e.sender_fp == fp)
            .collect())
    }

    fn by_type(&self, payload_type: &str) -> Result<Vec<InboxEntry>, StoreError> {
        Ok(self
            .all_inbox()?
            .into_iter()
            .filter(|e| e.payload_type == payload_type)
            .collect())
    }

    fn mark_read(&self, msg_id: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(INBOX).map_err(engine_err)?;
            let mut entry: InboxEntry = match table.get(msg_id).map_err(engine_err)? {
                Some(row) => de(row.value())?,
                None => {
                    return Err(StoreError::NotFound {
                        table: "inbox",
                        key: msg_id.to_string(),
                    });
                }
            };
            entry.read = true;
            let bytes = ser(&entry)?;
            table.insert(msg_id, bytes.as_slice()).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }

    fn delete(&self, msg_id: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(INBOX).map_err(engine_err)?;
            table.remove(msg_id).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }
}

impl SeenStore for RedbStore {
    fn check_and_mark(&self, msg_id: &str, sender_fp: &str) -> Result<bool, StoreError> {
        let key = SeenEntry::key(msg_id, sender_fp);
        let txn = self.db.begin_write().map_err(engine_err)?;
        let inserted = {
            let mut table = txn.open_table(SEEN).map_err(engine_err)?;
            if table.get(key.as_str()).map_err(engine_err)?.is_some() {
                false
            } else {
                let entry = SeenEntry {
                    msg_id: msg_id.to_string(),
                    sender_fp: sender_fp.to_string(),
                    seen_at: crate::time::now_ms(),
                };
                let bytes = ser(&entry)?;
                table.insert(key.as_str(), bytes.as_slice()).map_err(engine_err)?;
                true
            }
        };
        txn.commit().map_err(engine_err)?;
        Ok(inserted)
    }

    fn has(&self, msg_id: &str, sender_fp: &str) -> Result<bool, StoreError> {
        let key = SeenEntry::key(msg_id, sender_fp);
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(SEEN).map_err(engine_err)?;
        Ok(table.get(key.as_str()).map_err(engine_err)?.is_some())
    }

    fn cleanup(&self, max_age_ms: u64) -> Result<usize, StoreError> {
        let now = crate::time::now_ms();
        let txn = self.db.begin_write().map_err(engine_err)?;
        let removed = {
            let mut table = txn.open_table(SEEN).map_err(engine_err)?;
            let stale: Vec<String> = table
                .iter()
                .map_err(engine_err)?
                .filter_map(|row| row.ok())
                .filter_map(|(k, v)| {
                    let entry: SeenEntry = de(v.value()).ok()?;
                    if now.saturating_sub(entry.seen_at) > max_age_ms {
                        Some(k.value().to_string())
                    } else {
                        None
                    }
                })
                .collect();
            for key in &stale {
                table.remove(key.as_str()).map_err(engine_err)?;
            }
            stale.len()
        };
        txn.commit().map_err(engine_err)?;
        Ok(removed)
    }

    fn all_seen(&self) -> Result<Vec<SeenEntry>, StoreError> {
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(SEEN).map_err(engine_err)?;
        let mut out = Vec::new();
        for row in table.iter().map_err(engine_err)? {
            let (_, value) = row.map_err(engine_err)?;
            out.push(de(value.value())?);
        }
        Ok(out)
    }
}

impl ForwardedStore for RedbStore {
    fn mark_forwarded(&self, peer_fp: &str, msg_id: &str) -> Result<(), StoreError> {
        let key = ForwardedEntry::key(peer_fp, msg_id);
        let entry = ForwardedEntry {
            peer_fp: peer_fp.to_string(),
            msg_id: msg_id.to_string(),
            forwarded_at: crate::time::now_ms(),
        };
        let bytes = ser(&entry)?;
        let txn = self.db.begin_write().map_err(engine_err)?;
        {
            let mut table = txn.open_table(FORWARDED).map_err(engine_err)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(engine_err)?;
        }
        txn.commit().map_err(engine_err)?;
        Ok(())
    }

    fn was_forwarded(&self, peer_fp: &str, msg_id: &str) -> Result<bool, StoreError> {
        let key = ForwardedEntry::key(peer_fp, msg_id);
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(FORWARDED).map_err(engine_err)?;
        Ok(table.get(key.as_str()).map_err(engine_err)?.is_some())
    }

    fn forwarded_to(&self, peer_fp: &str) -> Result<Vec<String>, StoreError> {
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(FORWARDED).map_err(engine_err)?;
        let mut out = Vec::new();
        for row in table.iter().map_err(engine_err)? {
            let (_, value) = row.map_err(engine_err)?;
            let entry: ForwardedEntry = de(value.value())?;
            if entry.peer_fp == peer_fp {
                out.push(entry.msg_id);
            }
        }
        Ok(out)
    }

    fn cleanup(&self, max_age_ms: u64) -> Result<usize, StoreError> {
        let now = crate::time::now_ms();
        let txn = self.db.begin_write().map_err(engine_err)?;
        let removed = {
            let mut table = txn.open_table(FORWARDED).map_err(engine_err)?;
            let stale: Vec<String> = table
                .iter()
                .map_err(engine_err)?
                .filter_map(|row| row.ok())
                .filter_map(|(k, v)| {
                    let entry: ForwardedEntry = de(v.value()).ok()?;
                    if now.saturating_sub(entry.forwarded_at) > max_age_ms {
                        Some(k.value().to_string())
                    } else {
                        None
                    }
                })
                .collect();
            for key in &stale {
                table.remove(key.as_str()).map_err(engine_err)?;
            }
            stale.len()
        };
        txn.commit().map_err(engine_err)?;
        Ok(removed)
    }
}

impl ChunkStore for RedbStore {
    fn store(&self, entry: PartialChunkEntry) -> Result<Option<CompleteSet>, StoreError> {
        let msg_id = entry.msg_id.clone();
        let total = entry.total;
        let key = PartialChunkEntry::key(&entry.msg_id, entry.seq);
        let bytes = ser(&entry)?;

        let txn = self.db.begin_write().map_err(engine_err)?;
        let result = {
            let mut table = txn.open_table(PARTIAL_CHUNKS).map_err(engine_err)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(engine_err)?;

            let mut set: Vec<PartialChunkEntry> = table
                .iter()
                .map_err(engine_err)?
                .filter_map(|row| row.ok())
                .filter_map(|(_, v)| de::<PartialChunkEntry>(v.value()).ok())
                .filter(|e| e.msg_id == msg_id)
                .collect();

            let set_bytes: usize = set.iter().map(|e| e.data.len()).sum();
            if set_bytes > crate::memory::DEFAULT_MAX_PARTIAL_BYTES_PER_MESSAGE {
                if let Some((i, _)) = set
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, e)| e.received_at)
                {
                    let evicted = set.remove(i);
                    table
                        .remove(PartialChunkEntry::key(&evicted.msg_id, evicted.seq).as_str())
                        .map_err(engine_err)?;
                }
            }

            if set.len() as u32 != total {
                None
            } else {
                set.sort_by_key(|e| e.seq);
                if set.iter().enumerate().any(|(i, e)| e.seq != i as u32) {
                    None
                } else {
                    for e in &set {
                        table.remove(PartialChunkEntry::key(&e.msg_id, e.seq).as_str()).map_err(engine_err)?;
                    }
                    Some(CompleteSet {
                        msg_id: msg_id.clone(),
                        ordered_data: set.into_iter().map(|e| e.data).collect(),
                    })
                }
            }
        };
        txn.commit().map_err(engine_err)?;
        Ok(result)
    }

    fn cleanup(&self, max_age_ms: u64) -> Result<usize, StoreError> {
        let now = crate::time::now_ms();
        let txn = self.db.begin_write().map_err(engine_err)?;
        let removed = {
            let mut table = txn.open_table(PARTIAL_CHUNKS).map_err(engine_err)?;
            let stale: Vec<String> = table
                .iter()
                .map_err(engine_err)?
                .filter_map(|row| row.ok())
                .filter_map(|(k, v)| {
                    let entry: PartialChunkEntry = de(v.value()).ok()?;
                    if now.saturating_sub(entry.received_at) > max_age_ms {
                        Some(k.value().to_string())
                    } else {
                        None
                    }
                })
                .collect();
            for key in &stale {
                table.remove(key.as_str()).map_err(engine_err)?;
            }
            stale.len()
        };
        txn.commit().map_err(engine_err)?;
        Ok(removed)
    }

    fn partial_count(&self) -> Result<usize, StoreError> {
        let txn = self.db.begin_read().map_err(engine_err)?;
        let table = txn.open_table(PARTIAL_CHUNKS).map_err(engine_err)?;
        Ok(table.len().map_err(engine_err)? as usize)
    }
}

impl Store for RedbStore {
    fn stats(&self) -> Result<StoreStats, StoreError> {
        let txn = self.db.begin_read().map_err(engine_err)?;
        let len = |t: TableDefinition<&str, &[u8]>| -> Result<usize, StoreError> {
            Ok(txn.open_table(t).map_err(engine_err)?.len().map_err(engine_err)? as usize)
        };
        Ok(StoreStats {
            contacts: len(CONTACTS)?,
            outbox: len(OUTBOX)?,
            inbox: len(INBOX)?,
            seen: len(SEEN)?,
            forwarded: len(FORWARDED)?,
            partial_chunks: len(PARTIAL_CHUNKS)?,
        })
    }
}
