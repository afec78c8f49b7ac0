//! Persistent collections for the dmesh protocol: own-keys, contacts,
//! outbox, inbox, seen-set, forwarded-set, and partial chunks.
//!
//! Two backends are provided: [`MemoryStore`] for tests and embedders that
//! don't need durability, and [`RedbStore`] for everyone else. Both
//! implement the same set of per-collection traits, aggregated by [`Store`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod models;
pub mod redb_store;
pub mod replay;
pub mod time;
pub mod traits;

pub use error::StoreError;
pub use memory::{DEFAULT_MAX_PARTIAL_BYTES_PER_MESSAGE, MemoryStore};
pub use models::{
    Contact, ForwardedEntry, InboxEntry, OutboxEntry, OutboxStatus, OwnKeysRecord,
    PartialChunkEntry, SeenEntry, StoreStats, VerificationState,
};
pub use redb_store::RedbStore;
pub use replay::StoreReplayCheck;
pub use traits::{
    ChunkStore, CompleteSet, ContactsStore, DecodedInboxRecord, ForwardedStore, InboxStore,
    OutboxStore, OwnKeysStore, SeenStore, Store,
};
