//! Cryptographic core for the dmesh protocol.
//!
//! Key generation, the exact `SignBytes` construction, fingerprint/message-id
//! derivation, and the `encrypt`/`decrypt` envelope sealing procedures. Wire
//! shapes live in `dmesh-proto`; this crate is the only place that touches
//! key material or calls into `ed25519-dalek`/`x25519-dalek`/`crypto_box`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope_crypto;
pub mod error;
pub mod fingerprint;
pub mod keys;
pub mod policy;
pub mod sign_bytes;

pub use envelope_crypto::{DecryptedMessage, EncryptRequest, decrypt, encrypt};
pub use error::CryptoError;
pub use fingerprint::{fingerprint as derive_fingerprint, message_id as derive_message_id, safety_number};
pub use keys::{BoxKeyPair, EphemeralBoxKeyPair, SigningKeyPair, verify_signature};
pub use policy::{ReplayCheck, SenderPolicy, ValidityMode};
pub use sign_bytes::{SignFields, sign_bytes};
