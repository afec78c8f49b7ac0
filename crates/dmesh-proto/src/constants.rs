//! Protocol-wide constants.

/// Domain-separation tag prepended to every `SignBytes` construction.
pub const DOMAIN: &[u8; 12] = b"DMESH_MSG_V1";

/// Maximum plaintext content length, in UTF-8 bytes.
pub const MAX_BYTES: usize = 150 * 1024;

/// Maximum allowed clock skew in strict (v1.0) validity mode, in milliseconds.
pub const MAX_SKEW_MS: i64 = 10 * 60 * 1000;

/// Default message time-to-live, in milliseconds (7 days).
pub const DEFAULT_TTL_MS: u64 = 7 * 24 * 3600 * 1000;

/// Retention window for seen-set entries, in milliseconds (30 days).
pub const SEEN_RETENTION_MS: u64 = 30 * 24 * 3600 * 1000;

/// Age after which an incomplete partial-chunk set is swept, in milliseconds
/// (24 hours).
pub const PARTIAL_CHUNK_MAX_AGE_MS: u64 = 24 * 3600 * 1000;

/// Length of the XSalsa20-Poly1305 nonce, in bytes.
pub const NONCE_LEN: usize = 24;

/// Length of a detached Ed25519 signature, in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Length of an X25519 or Ed25519 public key, in bytes.
pub const BOX_PK_LEN: usize = 32;

/// Length of an Ed25519 public key, in bytes. Equal to [`BOX_PK_LEN`].
pub const SIGN_PK_LEN: usize = 32;

/// Length of an Ed25519 secret key (seed + public key), in bytes.
pub const SIGN_SK_LEN: usize = 64;

/// Length of an X25519 secret key, in bytes.
pub const BOX_SK_LEN: usize = 32;

/// Length of a [`crate::Fingerprint`], in bytes.
pub const FINGERPRINT_LEN: usize = 16;

/// Length of a [`crate::MessageId`], in bytes.
pub const MESSAGE_ID_LEN: usize = 32;

/// Recommended upper bound for a single QR-code chunk, in bytes.
pub const QR_MAX_CHUNK_SIZE: usize = 2048;

/// Recommended upper bound for a single SMS chunk, in bytes.
pub const SMS_MAX_CHUNK_SIZE: usize = 1200;

/// Recommended upper bound for a single LoRa chunk, in bytes.
pub const LORA_MAX_CHUNK_SIZE: usize = 200;

/// Recommended upper bound for a single BLE chunk, in bytes.
pub const BLE_MAX_CHUNK_SIZE: usize = 512;

/// Estimated JSON envelope overhead budgeted into each chunk.
pub const CHUNK_OVERHEAD: usize = 150;
