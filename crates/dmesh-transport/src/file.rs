//! File-blob transport.
//!
//! Operates purely on byte buffers the caller already has in hand; this
//! crate performs no filesystem I/O itself; reading/writing the named blob
//! to disk (or attaching it to a share sheet, etc.) is the embedding
//! application's job.

use dmesh_proto::{MessageEnvelope, PublicIdentity};

use crate::error::TransportError;
use crate::transport::{Capabilities, Transport};

/// A named byte blob ready to be written wherever the caller chooses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    /// Suggested file name, e.g. `message-ab12cd34.dmesh`.
    pub name: String,
    /// Raw contents (UTF-8 JSON).
    pub bytes: Vec<u8>,
}

/// Bidirectional transport over file blobs; no chunking, since files carry
/// arbitrarily large payloads in one unit.
#[derive(Debug, Default)]
pub struct FileTransport;

impl FileTransport {
    /// Construct a new adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Serialize an envelope into a named blob.
    ///
    /// # Errors
    /// Returns [`TransportError::Chunking`] if the envelope fails to
    /// serialize (a `serde_json` error, not a chunker error despite the
    /// variant name, since the two failure modes share a shape and this
    /// transport never actually chunks).
    pub fn send_envelope(&self, envelope: &MessageEnvelope) -> Result<FileBlob, TransportError> {
        let bytes = envelope
            .to_json_bytes()
            .map_err(|e| TransportError::Chunking { reason: e.to_string() })?;
        let msg_id = envelope.msg_id.as_deref().unwrap_or("unknown");
        let prefix: String = msg_id.chars().take(8).collect();
        Ok(FileBlob { name: format!("message-{prefix}.dmesh"), bytes })
    }

    /// Serialize an identity card into a named blob.
    ///
    /// # Errors
    /// Returns [`TransportError::Chunking`] if the identity fails to
    /// serialize.
    pub fn send_identity(&self, identity: &PublicIdentity) -> Result<FileBlob, TransportError> {
        let bytes = identity
            .to_json()
            .map_err(|e| TransportError::Chunking { reason: e.to_string() })?
            .into_bytes();
        let prefix: String = identity.fp.chars().take(8).collect();
        Ok(FileBlob { name: format!("identity-{prefix}.dmesh"), bytes })
    }

    /// Parse a received file blob as either a `dmesh-msg` envelope or a
    /// `dmesh-id` identity card.
    ///
    /// # Errors
    /// Returns [`TransportError::UnrecognizedData`] if the bytes are
    /// neither.
    pub fn receive_bytes(&self, bytes: &[u8]) -> Result<ReceivedFile, TransportError> {
        if let Ok(env) = MessageEnvelope::from_json_bytes(bytes) {
            return Ok(ReceivedFile::Envelope(env));
        }
        let text = String::from_utf8_lossy(bytes);
        if let Ok(id) = PublicIdentity::from_json(&text) {
            return Ok(ReceivedFile::Identity(id));
        }
        Err(TransportError::UnrecognizedData {
            name: "file".to_string(),
            reason: "bytes are neither a dmesh-msg envelope nor a dmesh-id card".to_string(),
        })
    }
}

/// The result of parsing a received file blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedFile {
    /// A sealed message envelope.
    Envelope(MessageEnvelope),
    /// A public identity card.
    Identity(PublicIdentity),
}

impl Transport for FileTransport {
    fn name(&self) -> &'static str {
        "file"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_payload_size: usize::MAX,
            supports_chunking: false,
            bidirectional: true,
            realtime: false,
            offline: true,
            peer_discovery: false,
        }
    }

    fn send(&self, envelope: &MessageEnvelope) -> Result<Vec<String>, TransportError> {
        let blob = self.send_envelope(envelope)?;
        Ok(vec![String::from_utf8_lossy(&blob.bytes).into_owned()])
    }

    fn receive(&mut self) -> Result<Vec<MessageEnvelope>, TransportError> {
        Ok(Vec::new())
    }

    fn is_available(&self) -> bool {
        true
    }
}
