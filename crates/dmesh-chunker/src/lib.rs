//! Chunker for the dmesh protocol: splits oversized serialized envelopes
//! into transport-sized fragments bound to a message id, and reassembles
//! them.
//!
//! This crate is pure and storage-free: it knows nothing about how a
//! partial chunk set is buffered while incomplete (that lives in
//! `dmesh-store`) and nothing about which transport carries the chunks
//! (`dmesh-transport`). It only implements `chunk`/`reassemble`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chunker;
pub mod error;

pub use chunker::{chunk, reassemble};
pub use error::ChunkerError;
