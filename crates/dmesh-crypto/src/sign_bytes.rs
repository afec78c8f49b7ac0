//! The byte-exact `SignBytes` construction.
//!
//! Every field is fixed-length or length-prefixed, so the construction is
//! unambiguous without needing a separator: `DOMAIN ‖ senderSignPK ‖
//! senderBoxPK ‖ recipientBoxPK ‖ ephPK ‖ nonce ‖ u64be(ts) ‖
//! u32be(len(ciphertext)) ‖ ciphertext`.
//!
//! This is the one piece of the wire format where byte-for-byte agreement
//! with every other implementation matters more than anywhere else: a
//! single reordered field silently breaks every signature ever produced.

use dmesh_proto::{
    constants::{BOX_PK_LEN, NONCE_LEN, SIGN_PK_LEN},
    primitives::{concat, u32be, u64be},
};

/// The fields bound into a message envelope's signature.
pub struct SignFields<'a> {
    /// Sender's Ed25519 signing public key.
    pub sender_sign_pk: &'a [u8; SIGN_PK_LEN],
    /// Sender's X25519 box public key.
    pub sender_box_pk: &'a [u8; BOX_PK_LEN],
    /// Recipient's X25519 box public key.
    pub recipient_box_pk: &'a [u8; BOX_PK_LEN],
    /// Ephemeral X25519 public key used to seal this message.
    pub eph_pk: &'a [u8; BOX_PK_LEN],
    /// 24-byte nonce.
    pub nonce: &'a [u8; NONCE_LEN],
    /// Creation time, Unix milliseconds.
    pub ts: u64,
    /// Sealed ciphertext (tag included).
    pub ciphertext: &'a [u8],
}

/// Build the exact byte sequence a sender signs and a recipient verifies.
pub fn sign_bytes(fields: &SignFields<'_>) -> Vec<u8> {
    let ts_bytes = u64be(fields.ts);
    let len_bytes = u32be(fields.ciphertext.len() as u32);
    concat(&[
        dmesh_proto::constants::DOMAIN,
        fields.sender_sign_pk,
        fields.sender_box_pk,
        fields.recipient_box_pk,
        fields.eph_pk,
        fields.nonce,
        &ts_bytes,
        &len_bytes,
        fields.ciphertext,
    ])
}
