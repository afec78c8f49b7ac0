//! The `dmesh-chunk` wire type.

use serde::{Deserialize, Serialize};

use crate::{error::DmeshError, primitives::b64_decode};

/// One fragment of a serialized [`crate::envelope::MessageEnvelope`] that was
/// too large for a transport's MTU.
///
/// Chunks are not themselves signed; integrity rests on the reassembled
/// envelope's signature, with `msg_id` binding a chunk set to one
/// specific ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Wire format version. Always `1`.
    pub v: u8,
    /// Wire kind discriminant. Always `"dmesh-chunk"`.
    pub kind: String,
    /// Base64-encoded [`crate::MessageId`] this chunk belongs to.
    #[serde(rename = "msgId")]
    pub msg_id: String,
    /// Zero-based sequence number within the chunk set.
    pub seq: u32,
    /// Total number of chunks in the set.
    pub total: u32,
    /// Base64-encoded slice of the serialized envelope.
    pub data: String,
}

impl Chunk {
    /// Wire kind discriminant for chunks.
    pub const KIND: &'static str = "dmesh-chunk";

    /// `v == 1 && kind == "dmesh-chunk"`.
    pub fn check_format(&self) -> Result<(), DmeshError> {
        if self.v != 1 || self.kind != Self::KIND {
            return Err(DmeshError::InvalidMessageFormat {
                reason: format!(
                    "expected v=1 kind={}, got v={} kind={}",
                    Self::KIND,
                    self.v,
                    self.kind
                ),
            });
        }
        Ok(())
    }

    /// Decode the base64 `data` field into raw bytes.
    pub fn decode_data(&self) -> Result<Vec<u8>, DmeshError> {
        b64_decode(&self.data)
    }

    /// Serialize to canonical JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse from JSON, checking `v`/`kind`.
    pub fn from_json(s: &str) -> Result<Self, DmeshError> {
        let chunk: Self = serde_json::from_str(s)
            .map_err(|e| DmeshError::JsonParseFailed { reason: e.to_string() })?;
        chunk.check_format()?;
        Ok(chunk)
    }
}
