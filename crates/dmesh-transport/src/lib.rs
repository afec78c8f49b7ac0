//! Transport adapters for the dmesh protocol: clipboard, QR, and file
//! carriers behind a common [`Transport`] trait, dispatched by
//! [`TransportManager`].
//!
//! None of these adapters perform camera, network, or raw filesystem I/O
//! themselves. Each consumes a thin capability (clipboard text, a decoded
//! scan, a byte buffer) that the embedding application supplies, treating
//! concrete carriers as external collaborators.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

#[cfg(feature = "clipboard")]
pub mod clipboard;
pub mod error;
pub mod file;
pub mod manager;
pub mod qr;
pub mod transport;

#[cfg(feature = "clipboard")]
pub use clipboard::ClipboardTransport;
pub use error::TransportError;
pub use file::{FileBlob, FileTransport, ReceivedFile};
pub use manager::{TaggedError, TaggedMessage, TransportManager};
pub use qr::{ChunkProgress, QrTransport};
pub use transport::{Capabilities, Transport};
