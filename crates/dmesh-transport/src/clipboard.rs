//! System-clipboard transport.

use dmesh_proto::{MessageEnvelope, PublicIdentity};

use crate::error::TransportError;
use crate::transport::{Capabilities, Transport};

/// Bidirectional transport over the system clipboard.
///
/// `send` writes one canonical JSON string; `receive` reads back whatever
/// text currently sits on the clipboard and, if it parses as a `dmesh-msg`
/// envelope, returns it. Unrelated clipboard content (including a
/// `dmesh-id` identity card, which this transport does not surface through
/// `receive`) is silently ignored rather than treated as an error, since
/// the clipboard is shared with everything else running on the host.
pub struct ClipboardTransport {
    clipboard: arboard::Clipboard,
    last_seen: Option<String>,
}

impl ClipboardTransport {
    /// Open a handle to the system clipboard.
    ///
    /// # Errors
    /// Returns [`TransportError::Unavailable`] if the host has no clipboard
    /// (e.g. a headless CI runner).
    pub fn new() -> Result<Self, TransportError> {
        let clipboard = arboard::Clipboard::new().map_err(|e| TransportError::Unavailable {
            name: "clipboard".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { clipboard, last_seen: None })
    }
}

impl Transport for ClipboardTransport {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_payload_size: usize::MAX,
            supports_chunking: false,
            bidirectional: true,
            realtime: true,
            offline: true,
            peer_discovery: false,
        }
    }

    fn send(&self, envelope: &MessageEnvelope) -> Result<Vec<String>, TransportError> {
        let json = envelope
            .to_json()
            .map_err(|e| TransportError::Chunking { reason: e.to_string() })?;
        Ok(vec![json])
    }

    fn receive(&mut self) -> Result<Vec<MessageEnvelope>, TransportError> {
        let text = match self.clipboard.get_text() {
            Ok(t) => t,
            Err(_) => return Ok(Vec::new()),
        };
        if self.last_seen.as_deref() == Some(text.as_str()) {
            return Ok(Vec::new());
        }
        self.last_seen = Some(text.clone());

        match MessageEnvelope::from_json(&text) {
            Ok(env) => Ok(vec![env]),
            Err(_) => Ok(Vec::new()),
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Write a `dmesh-id` identity card to the clipboard, for out-of-band
/// exchange alongside `ClipboardTransport`'s message traffic.
///
/// # Errors
/// Returns [`TransportError::Unavailable`] if the clipboard cannot be
/// written.
pub fn write_identity(
    clipboard: &mut arboard::Clipboard,
    identity: &PublicIdentity,
) -> Result<(), TransportError> {
    let json = identity
        .to_json()
        .map_err(|e| TransportError::Chunking { reason: e.to_string() })?;
    clipboard.set_text(json).map_err(|e| TransportError::Unavailable {
        name: "clipboard".to_string(),
        reason: e.to_string(),
    })
}

/// Read a `dmesh-id` identity card from the clipboard, if present.
///
/// # Errors
/// Returns [`TransportError::UnrecognizedData`] if the clipboard text does
/// not parse as a `dmesh-id` card.
pub fn read_identity(clipboard: &mut arboard::Clipboard) -> Result<PublicIdentity, TransportError> {
    let text = clipboard.get_text().map_err(|e| TransportError::Unavailable {
        name: "clipboard".to_string(),
        reason: e.to_string(),
    })?;
    PublicIdentity::from_json(&text).map_err(|e| TransportError::UnrecognizedData {
        name: "clipboard".to_string(),
        reason: e.to_string(),
    })
}
