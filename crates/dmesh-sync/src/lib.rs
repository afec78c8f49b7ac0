//! The five-phase HELLO/INV/GET/DATA/ACK sync engine for the dmesh protocol.
//!
//! This crate is pure and storage-free by design: [`SyncSession`] never
//! touches a store, a transport, or the system clock. Its methods take
//! already-fetched data (outbox candidates, seen-set membership, the
//! current time) and a signing key, and return a list of [`SyncAction`]s
//! for a driver to execute: sending frames, delivering envelopes for
//! decryption, and recording forwarded/delivered state.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod inventory;
pub mod priority;
pub mod rate_limit;
pub mod session;
pub mod want;

pub use config::SyncConfig;
pub use error::SyncError;
pub use inventory::InventoryCandidate;
pub use priority::{priority_of, priority_of_type};
pub use rate_limit::SessionRateLimiter;
pub use session::{Phase, PeerInfo, SyncAction, SyncFrame, SyncSession};
