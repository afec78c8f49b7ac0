//! The `dmesh-id` wire type: a shareable, unsigned public identity card.

use serde::{Deserialize, Serialize};

use crate::primitives::b64_encode;

/// A public identity, exchanged out-of-band (QR, clipboard, file) so a peer
/// can recognize and address a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIdentity {
    /// Wire format version. Always `1`.
    pub v: u8,
    /// Wire kind discriminant. Always `"dmesh-id"`.
    pub kind: String,
    /// Human-readable display name chosen by the identity's owner.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Base64-encoded [`crate::Fingerprint`].
    pub fp: String,
    /// Base64-encoded Ed25519 signing public key.
    #[serde(rename = "signPK")]
    pub sign_pk: String,
    /// Base64-encoded X25519 box public key.
    #[serde(rename = "boxPK")]
    pub box_pk: String,
}

impl PublicIdentity {
    /// Wire kind discriminant for identity cards.
    pub const KIND: &'static str = "dmesh-id";

    /// Build an identity card from raw key material.
    pub fn new(
        display_name: impl Into<String>,
        fingerprint: &[u8],
        sign_pk: &[u8; 32],
        box_pk: &[u8; 32],
    ) -> Self {
        Self {
            v: 1,
            kind: Self::KIND.to_string(),
            display_name: display_name.into(),
            fp: b64_encode(fingerprint),
            sign_pk: b64_encode(sign_pk),
            box_pk: b64_encode(box_pk),
        }
    }

    /// Serialize to canonical JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse from JSON, rejecting anything that is not a well-formed
    /// `dmesh-id` card.
    pub fn from_json(s: &str) -> Result<Self, crate::error::DmeshError> {
        let id: Self = serde_json::from_str(s)
            .map_err(|e| crate::error::DmeshError::JsonParseFailed { reason: e.to_string() })?;
        if id.v != 1 || id.kind != Self::KIND {
            return Err(crate::error::DmeshError::InvalidMessageFormat {
                reason: format!("expected v=1 kind={}, got v={} kind={}", Self::KIND, id.v, id.kind),
            });
        }
        Ok(id)
    }
}
