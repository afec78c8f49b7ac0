//! Stable error taxonomy shared across the dmesh workspace.
//!
//! Every crate in the workspace converts its own error type into
//! [`DmeshError`] at its public boundary: layered error types with `From`
//! conversions at the seams rather than one giant enum threaded through
//! every module.

use thiserror::Error;

/// Broad category an error belongs to.
///
/// Categories drive caller policy (retry, log-and-discard, abort session);
/// the stable [`DmeshError::code`] identifiers drive tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Cryptographic operation failed (decryption, signature, key generation).
    Crypto,
    /// Input failed a validation rule (size, clock skew, binding).
    Validation,
    /// Wire data could not be parsed into a known shape.
    Format,
    /// A security policy was violated (replay, unknown sender).
    Security,
    /// The persistent store reported a failure.
    Store,
    /// A transport adapter reported a failure.
    Transport,
}

/// Stable, structured error type for the dmesh protocol.
///
/// `code()` returns the stable identifier named in spec (`"DecryptionFailed"`,
/// `"TimestampSkew"`, ...); `category()` returns the broad class a caller
/// uses to decide policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DmeshError {
    /// Authenticated decryption failed (tampered ciphertext or wrong key).
    #[error("decryption failed")]
    DecryptionFailed,

    /// Ed25519 signature verification failed.
    #[error("signature invalid")]
    SignatureInvalid,

    /// A cryptographic key pair could not be generated.
    #[error("key generation failed: {reason}")]
    KeyGenerationFailed {
        /// Underlying reason, for diagnostics only.
        reason: String,
    },

    /// Plaintext content exceeded [`crate::MAX_BYTES`].
    #[error("content too large: {size} bytes exceeds limit of {limit} bytes")]
    ContentTooLarge {
        /// Size of the offending content, in bytes.
        size: usize,
        /// The configured limit, in bytes.
        limit: usize,
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

    /// The envelope's recipient box key does not match the caller's key.
    #[error("recipient mismatch")]
    RecipientMismatch,

    /// The observed sender key material does not match the caller's
    /// expectation (pinned contact).
    #[error("sender key mismatch for fingerprint")]
    SenderKeyMismatch,

    /// A fixed-length byte field decoded to the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length, in bytes.
        expected: usize,
        /// Actual decoded length, in bytes.
        actual: usize,
    },

    /// The envelope declared a `msg_id` that does not match the recomputed
    /// hash of its ciphertext.
    #[error("message id mismatch")]
    MessageIdMismatch,

    /// The JSON shape did not match the expected envelope/chunk/identity/
    /// frame structure (missing `v`/`kind`, or wrong `kind`).
    #[error("invalid message format: {reason}")]
    InvalidMessageFormat {
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// A base64 field failed to decode.
    #[error("base64 decode failed: {reason}")]
    Base64DecodeFailed {
        /// Underlying decode error, for diagnostics only.
        reason: String,
    },

    /// The wire payload was not valid JSON, or did not match the target
    /// schema.
    #[error("json parse failed: {reason}")]
    JsonParseFailed {
        /// Underlying parse error, for diagnostics only.
        reason: String,
    },

    /// The same `(msg_id, sender_fp)` pair was already marked seen.
    #[error("replay detected")]
    ReplayDetected,

    /// The sender's fingerprint is not recognized under the active policy.
    #[error("unknown sender")]
    UnknownSender,

    /// The persistent store failed to complete an operation.
    #[error("storage error: {reason}")]
    StorageError {
        /// Underlying storage error, for diagnostics only.
        reason: String,
    },

    /// A transport adapter failed to send or receive.
    #[error("transport error: {reason}")]
    TransportError {
        /// Underlying transport error, for diagnostics only.
        reason: String,
    },
}

impl DmeshError {
    /// The stable, test-facing identifier for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DecryptionFailed => "DecryptionFailed",
            Self::SignatureInvalid => "SignatureInvalid",
            Self::KeyGenerationFailed { .. } => "KeyGenerationFailed",
            Self::ContentTooLarge { .. } => "ContentTooLarge",
            Self::TimestampSkew { .. } => "TimestampSkew",
            Self::MessageExpired { .. } => "MessageExpired",
            Self::RecipientMismatch => "RecipientMismatch",
            Self::SenderKeyMismatch => "SenderKeyMismatch",
            Self::InvalidKeyLength { .. } => "InvalidKeyLength",
            Self::MessageIdMismatch => "MessageIdMismatch",
            Self::InvalidMessageFormat { .. } => "InvalidMessageFormat",
            Self::Base64DecodeFailed { .. } => "Base64DecodeFailed",
            Self::JsonParseFailed { .. } => "JsonParseFailed",
            Self::ReplayDetected => "ReplayDetected",
            Self::UnknownSender => "UnknownSender",
            Self::StorageError { .. } => "StorageError",
            Self::TransportError { .. } => "TransportError",
        }
    }

    /// The broad category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DecryptionFailed | Self::SignatureInvalid | Self::KeyGenerationFailed { .. } => {
                ErrorCategory::Crypto
            },
            Self::ContentTooLarge { .. }
            | Self::TimestampSkew { .. }
            | Self::MessageExpired { .. }
            | Self::RecipientMismatch
            | Self::SenderKeyMismatch
            | Self::InvalidKeyLength { .. }
            | Self::MessageIdMismatch => ErrorCategory::Validation,
            Self::InvalidMessageFormat { .. }
            | Self::Base64DecodeFailed { .. }
            | Self::JsonParseFailed { .. } => ErrorCategory::Format,
            Self::ReplayDetected | Self::UnknownSender => ErrorCategory::Security,
            Self::StorageError { .. } => ErrorCategory::Store,
            Self::TransportError { .. } => ErrorCategory::Transport,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_identifiers() {
        assert_eq!(DmeshError::ReplayDetected.code(), "ReplayDetected");
        assert_eq!(
            DmeshError::MessageExpired { exp: 0, now: 1 }.code(),
            "MessageExpired"
        );
    }

    #[test]
    fn categories_group_as_specified() {
        assert_eq!(DmeshError::SignatureInvalid.category(), ErrorCategory::Crypto);
        assert_eq!(DmeshError::RecipientMismatch.category(), ErrorCategory::Validation);
        assert_eq!(
            DmeshError::Base64DecodeFailed { reason: "x".into() }.category(),
            ErrorCategory::Format
        );
        assert_eq!(DmeshError::UnknownSender.category(), ErrorCategory::Security);
        assert_eq!(
            DmeshError::StorageError { reason: "x".into() }.category(),
            ErrorCategory::Store
        );
        assert_eq!(
            DmeshError::TransportError { reason: "x".into() }.category(),
            ErrorCategory::Transport
        );
    }
}
