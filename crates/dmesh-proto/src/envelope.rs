//! The `dmesh-msg` wire type: a self-authenticating encrypted envelope.
//!
//! This module only owns the wire *shape* (JSON <-> base64 fields) and the
//! decoded fixed-length byte form used by `SignBytes`. The actual seal/open
//! and signature verification live in `dmesh-crypto`, which depends on this
//! crate for the codec.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{BOX_PK_LEN, NONCE_LEN, SIGNATURE_LEN, SIGN_PK_LEN},
    error::DmeshError,
    primitives::{b64_decode, b64_decode_fixed, b64_encode},
};

/// The encrypted message envelope as it appears on the wire.
///
/// `msg_id` and `exp` are `Option` for v1.0 compatibility: implementations
/// MUST accept envelopes without them and MUST validate them when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Wire format version. Always `1`.
    pub v: u8,
    /// Wire kind discriminant. Always `"dmesh-msg"`.
    pub kind: String,
    /// Base64-encoded [`crate::MessageId`], if the sender included it (v1.1+).
    #[serde(rename = "msgId", skip_serializing_if = "Option::is_none", default)]
    pub msg_id: Option<String>,
    /// Creation time, Unix milliseconds.
    pub ts: u64,
    /// Expiration time, Unix milliseconds. Absent in pure v1.0 messages.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exp: Option<u64>,
    /// Base64-encoded sender Ed25519 signing public key.
    #[serde(rename = "senderSignPK")]
    pub sender_sign_pk: String,
    /// Base64-encoded sender X25519 box public key.
    #[serde(rename = "senderBoxPK")]
    pub sender_box_pk: String,
    /// Base64-encoded recipient X25519 box public key.
    #[serde(rename = "recipientBoxPK")]
    pub recipient_box_pk: String,
    /// Base64-encoded ephemeral X25519 public key used to seal this message.
    #[serde(rename = "ephPK")]
    pub eph_pk: String,
    /// Base64-encoded 24-byte nonce.
    pub nonce: String,
    /// Base64-encoded ciphertext (includes the Poly1305 tag).
    pub ciphertext: String,
    /// Base64-encoded 64-byte detached Ed25519 signature.
    pub signature: String,
}

/// Decoded, fixed-length byte form of a [`MessageEnvelope`], used to build
/// `SignBytes` and to drive the decrypt state machine.
#[derive(Debug, Clone)]
pub struct DecodedEnvelope {
    /// `msg_id` declared by the sender, if present.
    pub msg_id: Option<[u8; 32]>,
    /// Creation time, Unix milliseconds.
    pub ts: u64,
    /// Expiration time, Unix milliseconds, if present.
    pub exp: Option<u64>,
    /// Sender Ed25519 signing public key.
    pub sender_sign_pk: [u8; SIGN_PK_LEN],
    /// Sender X25519 box public key.
    pub sender_box_pk: [u8; BOX_PK_LEN],
    /// Recipient X25519 box public key.
    pub recipient_box_pk: [u8; BOX_PK_LEN],
    /// Ephemeral X25519 public key.
    pub eph_pk: [u8; BOX_PK_LEN],
    /// 24-byte nonce.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext bytes.
    pub ciphertext: Vec<u8>,
    /// 64-byte detached Ed25519 signature.
    pub signature: [u8; SIGNATURE_LEN],
}

impl MessageEnvelope {
    /// Wire kind discriminant for message envelopes.
    pub const KIND: &'static str = "dmesh-msg";

    /// Construct the wire form from already-base64 fixed-length fields.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg_id: Option<[u8; 32]>,
        ts: u64,
        exp: Option<u64>,
        sender_sign_pk: &[u8; SIGN_PK_LEN],
        sender_box_pk: &[u8; BOX_PK_LEN],
        recipient_box_pk: &[u8; BOX_PK_LEN],
        eph_pk: &[u8; BOX_PK_LEN],
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
        signature: &[u8; SIGNATURE_LEN],
    ) -> Self {
        Self {
            v: 1,
            kind: Self::KIND.to_string(),
            msg_id: msg_id.map(|id| b64_encode(&id)),
            ts,
            exp,
            sender_sign_pk: b64_encode(sender_sign_pk),
            sender_box_pk: b64_encode(sender_box_pk),
            recipient_box_pk: b64_encode(recipient_box_pk),
            eph_pk: b64_encode(eph_pk),
            nonce: b64_encode(nonce),
            ciphertext: b64_encode(ciphertext),
            signature: b64_encode(signature),
        }
    }

    /// Serialize to canonical JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize to canonical, UTF-8-encoded JSON bytes.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse from JSON, only checking `v`/`kind`. Field-level decoding and
    /// length validation happens in [`MessageEnvelope::decode`] instead, so
    /// callers can distinguish a structurally-wrong envelope from a
    /// well-formed one with bad field lengths.
    pub fn from_json(s: &str) -> Result<Self, DmeshError> {
        let env: Self = serde_json::from_str(s)
            .map_err(|e| DmeshError::JsonParseFailed { reason: e.to_string() })?;
        env.check_format()?;
        Ok(env)
    }

    /// Parse from UTF-8 JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, DmeshError> {
        let env: Self = serde_json::from_slice(bytes)
            .map_err(|e| DmeshError::JsonParseFailed { reason: e.to_string() })?;
        env.check_format()?;
        Ok(env)
    }

    /// `v == 1 && kind == "dmesh-msg"`.
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

    /// Decode and length-check every byte field.
    pub fn decode(&self) -> Result<DecodedEnvelope, DmeshError> {
        self.check_format()?;

        let msg_id = match &self.msg_id {
            Some(s) => Some(b64_decode_fixed::<32>(s)?),
            None => None,
        };
        let sender_sign_pk = b64_decode_fixed::<SIGN_PK_LEN>(&self.sender_sign_pk)?;
        let sender_box_pk = b64_decode_fixed::<BOX_PK_LEN>(&self.sender_box_pk)?;
        let recipient_box_pk = b64_decode_fixed::<BOX_PK_LEN>(&self.recipient_box_pk)?;
        let eph_pk = b64_decode_fixed::<BOX_PK_LEN>(&self.eph_pk)?;
        let nonce = b64_decode_fixed::<NONCE_LEN>(&self.nonce)?;
        let ciphertext = b64_decode(&self.ciphertext)?;
        let signature = b64_decode_fixed::<SIGNATURE_LEN>(&self.signature)?;

        if !self.ts.is_finite_timestamp() {
            return Err(DmeshError::InvalidMessageFormat {
                reason: "ts is not a finite integer".to_string(),
            });
        }

        Ok(DecodedEnvelope {
            msg_id,
            ts: self.ts,
            exp: self.exp,
            sender_sign_pk,
            sender_box_pk,
            recipient_box_pk,
            eph_pk,
            nonce,
            ciphertext,
            signature,
        })
    }
}

/// Trivial extension point: `u64` from JSON is already a finite integer by
/// construction (serde_json rejects NaN/Infinity), kept as a named check so
/// the validation order in [`MessageEnvelope::decode`] stays legible as a
/// sequence of named checks.
trait FiniteTimestamp {
    fn is_finite_timestamp(&self) -> bool;
}

impl FiniteTimestamp for u64 {
    fn is_finite_timestamp(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> MessageEnvelope {
        MessageEnvelope::new(
            Some([7u8; 32]),
            1_706_012_345_678,
            Some(1_706_617_145_678),
            &[1u8; 32],
            &[2u8; 32],
            &[3u8; 32],
            &[4u8; 32],
            &[5u8; 24],
            &[9u8; 48],
            &[6u8; 64],
        )
    }

    #[test]
    fn round_trips_through_json() {
        let env = sample();
        let json = env.to_json().unwrap();
        let parsed = MessageEnvelope::from_json(&json).unwrap();
        assert_eq!(env, parsed);
    }

    #[test]
    fn decode_recovers_exact_bytes() {
        let env = sample();
        let decoded = env.decode().unwrap();
        assert_eq!(decoded.sender_sign_pk, [1u8; 32]);
        assert_eq!(decoded.nonce, [5u8; 24]);
        assert_eq!(decoded.signature, [6u8; 64]);
        assert_eq!(decoded.msg_id, Some([7u8; 32]));
    }

    #[test]
    fn v1_0_messages_without_msg_id_or_exp_are_accepted() {
        let mut env = sample();
        env.msg_id = None;
        env.exp = None;
        let json = env.to_json().unwrap();
        assert!(!json.contains("msgId"));
        assert!(!json.contains("\"exp\""));
        let parsed = MessageEnvelope::from_json(&json).unwrap();
        assert!(parsed.decode().unwrap().msg_id.is_none());
    }

    #[test]
    fn rejects_wrong_kind() {
        let mut env = sample();
        env.kind = "dmesh-chunk".to_string();
        assert!(env.check_format().is_err());
    }

    #[test]
    fn decode_rejects_bad_field_length() {
        let mut env = sample();
        env.nonce = crate::primitives::b64_encode(&[1u8; 10]);
        let err = env.decode().unwrap_err();
        assert_eq!(err.code(), "InvalidKeyLength");
    }
}
