//! Key-pair generation for both cryptographic roles an identity holds: a
//! long-term Ed25519 signing pair and a long-term X25519 box-agreement
//! pair, plus the ephemeral X25519 pair generated fresh for every
//! `encrypt` call.
//!
//! Secret material is zeroized on drop rather than left for callers to
//! scrub themselves.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};

use crate::error::CryptoError;

/// A long-term Ed25519 signing key pair.
///
/// `ed25519_dalek::SigningKey` zeroizes its own secret scalar on drop.
pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl SigningKeyPair {
    /// Generate a fresh signing key pair from the system RNG.
    pub fn generate() -> Result<Self, CryptoError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        Ok(Self { signing_key })
    }

    /// Reconstruct a signing key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self { signing_key: SigningKey::from_bytes(seed) }
    }

    /// The 32-byte public verifying key, as carried in `senderSignPK`.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Produce a detached 64-byte Ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Verify a detached Ed25519 signature against a raw 32-byte public key.
pub fn verify_signature(
    public_key: &[u8; 32],
    message: &[u8],
    signature: &[u8; 64],
) -> Result<(), CryptoError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key).map_err(|_| CryptoError::SignatureInvalid)?;
    let sig = ed25519_dalek::Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).map_err(|_| CryptoError::SignatureInvalid)
}

/// A long-term X25519 key-agreement pair, used as the stable `boxPK`
/// identity contacts pin via TOFU.
///
/// `x25519_dalek::StaticSecret` zeroizes its own scalar on drop.
pub struct BoxKeyPair {
    secret: StaticSecret,
    public: XPublicKey,
}

impl BoxKeyPair {
    /// Generate a fresh box key pair from the system RNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = XPublicKey::from(&secret);
        Self { secret, public }
    }

    /// Reconstruct a box key pair from a 32-byte secret scalar.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = XPublicKey::from(&secret);
        Self { secret, public }
    }

    /// The 32-byte public key, as carried in `senderBoxPK`/`recipientBoxPK`.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Borrow the secret scalar for Diffie-Hellman.
    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

/// An ephemeral X25519 key pair, generated fresh for a single `encrypt`
/// call and discarded immediately after sealing.
///
/// `x25519_dalek::StaticSecret` zeroizes its own scalar on drop.
pub struct EphemeralBoxKeyPair {
    secret: StaticSecret,
    public: XPublicKey,
}

impl EphemeralBoxKeyPair {
    /// Generate a fresh ephemeral box key pair from the system RNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = XPublicKey::from(&secret);
        Self { secret, public }
    }

    /// The 32-byte public key, carried in the envelope's `ephPK` field.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Borrow the secret scalar for Diffie-Hellman.
    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn signing_round_trips() {
        let pair = SigningKeyPair::generate().unwrap();
        let msg = b"hello dmesh";
        let sig = pair.sign(msg);
        verify_signature(&pair.public_key_bytes(), msg, &sig).unwrap();
    }

    #[test]
    fn signature_rejects_tampered_message() {
        let pair = SigningKeyPair::generate().unwrap();
        let sig = pair.sign(b"original");
        let result = verify_signature(&pair.public_key_bytes(), b"tampered", &sig);
        assert!(result.is_err());
    }

    #[test]
    fn box_keypair_generates_distinct_keys() {
        let a = BoxKeyPair::generate();
        let b = BoxKeyPair::generate();
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
    }

    #[test]
    fn box_keypair_from_seed_is_deterministic() {
        let seed = [9u8; 32];
        let a = BoxKeyPair::from_secret_bytes(seed);
        let b = BoxKeyPair::from_secret_bytes(seed);
        assert_eq!(a.public_key_bytes(), b.public_key_bytes());
    }

    #[test]
    fn ephemeral_keys_are_unique_per_call() {
        let a = EphemeralBoxKeyPair::generate();
        let b = EphemeralBoxKeyPair::generate();
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
    }
}
