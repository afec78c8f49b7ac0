//! QR-code transport.
//!
//! This adapter never touches a camera or an image-decoding library.
//! Producing and scanning the actual QR frames is an external
//! collaborator's job. This crate only produces the JSON strings a caller
//! should render as QR codes, and consumes whatever a scanner decoded back
//! into text via [`QrTransport::process_scanned`].

use std::collections::{BTreeSet, HashMap};

use dmesh_proto::{Chunk, MessageEnvelope, QR_MAX_CHUNK_SIZE};

use crate::error::TransportError;
use crate::transport::{Capabilities, Transport};

/// The state of one in-progress chunk reassembly.
#[derive(Debug, Clone, Default)]
pub struct ChunkProgress {
    /// Sequence numbers received so far.
    pub received: BTreeSet<u32>,
    /// Total chunks the set declares, once any chunk has arrived.
    pub total: Option<u32>,
}

impl ChunkProgress {
    /// Sequence numbers not yet received, if the total is known.
    #[must_use]
    pub fn missing(&self) -> Option<BTreeSet<u32>> {
        self.total.map(|total| {
            (0..total)
                .filter(|seq| !self.received.contains(seq))
                .collect()
        })
    }
}

/// One-way-per-sweep transport over QR code frames.
///
/// `send` splits an envelope into QR-sized chunks when needed and returns
/// the JSON strings to render, one QR code per string. Reception is
/// event-driven: feed each scanned string to [`Self::process_scanned`].
pub struct QrTransport {
    partial: HashMap<String, Vec<Chunk>>,
}

impl QrTransport {
    /// Construct a fresh adapter with no in-progress scans.
    #[must_use]
    pub fn new() -> Self {
        Self { partial: HashMap::new() }
    }

    /// Feed one scanned string (the payload of a single decoded QR code).
    ///
    /// Returns `Ok(Some(envelope))` once a complete chunk set (or a single
    /// unchunked envelope) has been scanned, `Ok(None)` while still
    /// collecting chunks.
    ///
    /// # Errors
    /// Returns [`TransportError::UnrecognizedData`] if the scanned text is
    /// neither a `dmesh-msg` envelope nor a `dmesh-chunk` fragment, and
    /// [`TransportError::Chunking`] if a complete chunk set fails to
    /// reassemble.
    pub fn process_scanned(&mut self, data: &str) -> Result<Option<MessageEnvelope>, TransportError> {
        if let Ok(env) = MessageEnvelope::from_json(data) {
            return Ok(Some(env));
        }

        let chunk: Chunk = serde_json::from_str(data).map_err(|_| TransportError::UnrecognizedData {
            name: "qr".to_string(),
            reason: "scanned text is neither a dmesh-msg envelope nor a dmesh-chunk fragment"
                .to_string(),
        })?;
        chunk.check_format().map_err(|e| TransportError::UnrecognizedData {
            name: "qr".to_string(),
            reason: e.to_string(),
        })?;

        let total = chunk.total;
        let set = self.partial.entry(chunk.msg_id.clone()).or_default();
        if !set.iter().any(|c| c.seq == chunk.seq) {
            set.push(chunk);
        }

        if set.len() as u32 == total {
            let msg_id = set[0].msg_id.clone();
            let chunks = self.partial.remove(&msg_id).unwrap_or_default();
            let envelope = dmesh_chunker::reassemble(&chunks)?;
            return Ok(Some(envelope));
        }
        Ok(None)
    }

    /// Report how much of an in-progress chunk set has arrived.
    #[must_use]
    pub fn get_chunk_progress(&self, msg_id: &str) -> ChunkProgress {
        match self.partial.get(msg_id) {
            Some(chunks) => ChunkProgress {
                received: chunks.iter().map(|c| c.seq).collect(),
                total: chunks.first().map(|c| c.total),
            },
            None => ChunkProgress::default(),
        }
    }
}

impl Default for QrTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for QrTransport {
    fn name(&self) -> &'static str {
        "qr"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_payload_size: QR_MAX_CHUNK_SIZE,
            supports_chunking: true,
            bidirectional: false,
            realtime: false,
            offline: true,
            peer_discovery: false,
        }
    }

    fn send(&self, envelope: &MessageEnvelope) -> Result<Vec<String>, TransportError> {
        let json = envelope
            .to_json_bytes()
            .map_err(|e| TransportError::Chunking { reason: e.to_string() })?;

        if json.len() <= QR_MAX_CHUNK_SIZE {
            return Ok(vec![String::from_utf8_lossy(&json).into_owned()]);
        }

        let chunks = dmesh_chunker::chunk(envelope, QR_MAX_CHUNK_SIZE)?;
        chunks
            .iter()
            .map(|c| c.to_json().map_err(|e| TransportError::Chunking { reason: e.to_string() }))
            .collect()
    }

    fn receive(&mut self) -> Result<Vec<MessageEnvelope>, TransportError> {
        Ok(Vec::new())
    }

    fn is_available(&self) -> bool {
        true
    }
}
