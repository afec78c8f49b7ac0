//! Crypto-core error type and its conversion into the workspace-wide
//! [`dmesh_proto::DmeshError`].

use dmesh_proto::DmeshError;
use thiserror::Error;

/// Errors raised by `dmesh-crypto` operations.
///
/// Every variant maps onto a spec-stable [`DmeshError`] via `From`, so
/// callers that only care about the stable taxonomy can convert once at the
/// boundary, while callers inside this crate keep richer context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Plaintext content exceeded the configured maximum.
    #[error("content too large: {size} bytes exceeds limit of {limit} bytes")]
    ContentTooLarge {
        /// Size of the offending content, in bytes.
        size: usize,
        /// The configured limit, in bytes.
        limit: usize,
    },

    /// A key pair could not be generated from the system RNG.
    #[error("key generation failed: {reason}")]
    KeyGenerationFailed {
        /// Underlying reason, for diagnostics only.
        reason: String,
    },

    /// The envelope's `v`/`kind` did not match `dmesh-msg`.
    #[error("invalid message format: {reason}")]
    InvalidMessageFormat {
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// A base64 field failed to decode, or decoded to the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length, in bytes.
        expected: usize,
        /// Actual decoded length, in bytes.
        actual: usize,
    },

    /// A base64 field was not valid base64.
    #[error("base64 decode failed: {reason}")]
    Base64DecodeFailed {
        /// Underlying decode error, for diagnostics only.
        reason: String,
    },

    /// Strict-mode clock skew exceeded the allowed window.
    #[error("timestamp skew of {skew_ms}ms exceeds limit of {limit_ms}ms")]
    TimestampSkew {
        /// Observed skew, in milliseconds.
        skew_ms: i64,
        /// The configured limit, in milliseconds.
        limit_ms: i64,
    },

    /// Delay-tolerant-mode validity window has elapsed.
    #[error("message expired at {exp}, now is {now}")]
    MessageExpired {
        /// Envelope expiration, in Unix milliseconds.
        exp: u64,
        /// Current time, in Unix milliseconds.
        now: u64,
    },

    /// The envelope declared a `msg_id` that does not match the recomputed
    /// hash of its ciphertext.
    #[error("message id mismatch")]
    MessageIdMismatch,

    /// The envelope's recipient box key does not match the caller's key.
    #[error("recipient mismatch")]
    RecipientMismatch,

    /// The observed sender key material does not match the caller's pinned
    /// expectation.
    #[error("sender key mismatch")]
    SenderKeyMismatch,

    /// Ed25519 signature verification failed.
    #[error("signature invalid")]
    SignatureInvalid,

    /// The `(msg_id, sender_fp)` pair was already marked seen.
    #[error("replay detected")]
    ReplayDetected,

    /// Authenticated decryption (box-open) failed.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Decrypted plaintext was not valid JSON matching the payload schema.
    #[error("json parse failed: {reason}")]
    JsonParseFailed {
        /// Underlying parse error, for diagnostics only.
        reason: String,
    },
}

impl From<CryptoError> for DmeshError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::ContentTooLarge { size, limit } => {
                DmeshError::ContentTooLarge { size, limit }
            },
            CryptoError::KeyGenerationFailed { reason } => {
                DmeshError::KeyGenerationFailed { reason }
            },
            CryptoError::InvalidMessageFormat { reason } => {
                DmeshError::InvalidMessageFormat { reason }
            },
            CryptoError::InvalidKeyLength { expected, actual } => {
                DmeshError::InvalidKeyLength { expected, actual }
            },
            CryptoError::Base64DecodeFailed { reason } => {
                DmeshError::Base64DecodeFailed { reason }
            },
            CryptoError::TimestampSkew { skew_ms, limit_ms } => {
                DmeshError::TimestampSkew { skew_ms, limit_ms }
            },
            CryptoError::MessageExpired { exp, now } => DmeshError::MessageExpired { exp, now },
            CryptoError::MessageIdMismatch => DmeshError::MessageIdMismatch,
            CryptoError::RecipientMismatch => DmeshError::RecipientMismatch,
            CryptoError::SenderKeyMismatch => DmeshError::SenderKeyMismatch,
            CryptoError::SignatureInvalid => DmeshError::SignatureInvalid,
            CryptoError::ReplayDetected => DmeshError::ReplayDetected,
            CryptoError::DecryptionFailed => DmeshError::DecryptionFailed,
            CryptoError::JsonParseFailed { reason } => DmeshError::JsonParseFailed { reason },
        }
    }
}

impl From<DmeshError> for CryptoError {
    fn from(err: DmeshError) -> Self {
        match err {
            DmeshError::ContentTooLarge { size, limit } => {
                CryptoError::ContentTooLarge { size, limit }
            },
            DmeshError::KeyGenerationFailed { reason } => {
                CryptoError::KeyGenerationFailed { reason }
            },
            DmeshError::InvalidMessageFormat { reason } => {
                CryptoError::InvalidMessageFormat { reason }
            },
            DmeshError::InvalidKeyLength { expected, actual } => {
                CryptoError::InvalidKeyLength { expected, actual }
            },
            DmeshError::Base64DecodeFailed { reason } => {
                CryptoError::Base64DecodeFailed { reason }
            },
            DmeshError::TimestampSkew { skew_ms, limit_ms } => {
                CryptoError::TimestampSkew { skew_ms, limit_ms }
            },
            DmeshError::MessageExpired { exp, now } => CryptoError::MessageExpired { exp, now },
            DmeshError::MessageIdMismatch => CryptoError::MessageIdMismatch,
            DmeshError::RecipientMismatch => CryptoError::RecipientMismatch,
            DmeshError::SenderKeyMismatch => CryptoError::SenderKeyMismatch,
            DmeshError::SignatureInvalid => CryptoError::SignatureInvalid,
            DmeshError::ReplayDetected => CryptoError::ReplayDetected,
            DmeshError::DecryptionFailed => CryptoError::DecryptionFailed,
            DmeshError::JsonParseFailed { reason } => CryptoError::JsonParseFailed { reason },
            other => CryptoError::InvalidMessageFormat { reason: other.to_string() },
        }
    }
}
