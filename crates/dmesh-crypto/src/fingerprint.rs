//! Fingerprints, message ids, and human-verifiable safety numbers.

use dmesh_proto::{Fingerprint, MessageId};
use sha2::{Digest, Sha512};

/// Derive a party's 16-byte fingerprint from their Ed25519 signing public
/// key: `SHA-512(signing_pk)[0..16]`.
pub fn fingerprint(signing_pk: &[u8; 32]) -> Fingerprint {
    let digest = Sha512::digest(signing_pk);
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

/// Derive a message's 32-byte id from its ciphertext: `SHA-512(ciphertext)[0..32]`.
pub fn message_id(ciphertext: &[u8]) -> MessageId {
    let digest = Sha512::digest(ciphertext);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

/// A human-verifiable safety number for a pair of fingerprints, used for
/// out-of-band contact verification.
///
/// Derived by XOR-ing the two fingerprints in sorted (lexicographic) order
/// so both parties compute the same value regardless of which one is
/// "self", then reducing the first 4 bytes to an 8-digit decimal code
/// formatted as `NNNN-NNNN`.
pub fn safety_number(a: &Fingerprint, b: &Fingerprint) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut xored = [0u8; 16];
    for i in 0..16 {
        xored[i] = lo[i] ^ hi[i];
    }
    let code = u32::from_be_bytes([xored[0], xored[1], xored[2], xored[3]]) % 100_000_000;
    format!("{:04}-{:04}", code / 10_000, code % 10_000)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let pk = [42u8; 32];
        assert_eq!(fingerprint(&pk), fingerprint(&pk));
    }

    #[test]
    fn fingerprint_has_correct_length() {
        let pk = [1u8; 32];
        assert_eq!(fingerprint(&pk).len(), 16);
    }

    #[test]
    fn fingerprint_differs_for_different_keys() {
        assert_ne!(fingerprint(&[1u8; 32]), fingerprint(&[2u8; 32]));
    }

    #[test]
    fn fingerprint_matches_sha512_prefix_formula() {
        let pk = [7u8; 32];
        let full = Sha512::digest(pk);
        let fp = fingerprint(&pk);
        assert_eq!(&fp[..], &full[..16]);
    }

    #[test]
    fn message_id_is_deterministic_and_sized() {
        let ct = b"some ciphertext bytes";
        let id_a = message_id(ct);
        let id_b = message_id(ct);
        assert_eq!(id_a, id_b);
        assert_eq!(id_a.len(), 32);
    }

    #[test]
    fn message_id_differs_for_different_ciphertext() {
        assert_ne!(message_id(b"a"), message_id(b"b"));
    }

    #[test]
    fn safety_number_is_symmetric() {
        let a = fingerprint(&[1u8; 32]);
        let b = fingerprint(&[2u8; 32]);
        assert_eq!(safety_number(&a, &b), safety_number(&b, &a));
    }

    #[test]
    fn safety_number_has_fixed_format() {
        let a = fingerprint(&[1u8; 32]);
        let b = fingerprint(&[2u8; 32]);
        let code = safety_number(&a, &b);
        assert_eq!(code.len(), 9);
        assert_eq!(code.chars().nth(4), Some('-'));
        assert!(code.chars().filter(|c| *c != '-').all(|c| c.is_ascii_digit()));
    }
}
