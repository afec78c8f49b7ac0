//! Decrypt-time policy seams: how strictly to validate a message's time
//! window, how to treat a sender's key material, and how to check for
//! replays.
//!
//! The v1.0/v1.1 validity behaviors and the TOFU pinning rule are each
//! naturally a small closed set of modes rather than a boolean flag or a
//! nullable parameter threaded through `decrypt`; modeling them as enums
//! and a trait keeps the call site self-documenting and lets callers swap
//! the replay check for a real store without `decrypt` knowing about
//! storage at all.

use dmesh_proto::Fingerprint;

use crate::error::CryptoError;

/// How `decrypt` validates an envelope's time fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityMode {
    /// v1.0 behavior: reject if `|now - ts| > MAX_SKEW_MS`. Used for
    /// interactive, low-latency transports where a large skew usually means
    /// clock drift or forgery rather than legitimate delay.
    Strict {
        /// Current time, Unix milliseconds.
        now: u64,
    },
    /// v1.1 behavior: ignore clock skew entirely and instead reject once the
    /// message's validity window has elapsed, using `exp` if present,
    /// otherwise `ts + DEFAULT_TTL_MS`. Used for delay-tolerant transports
    /// (QR/SMS/sneakernet) where store-and-forward delay of hours or days is
    /// normal and expected.
    DelayTolerant {
        /// Current time, Unix milliseconds.
        now: u64,
    },
}

impl ValidityMode {
    /// Validate an envelope's `ts`/`exp` pair against this mode.
    pub fn check(&self, ts: u64, exp: Option<u64>) -> Result<(), CryptoError> {
        match self {
            ValidityMode::Strict { now } => {
                let skew_ms = (*now as i64) - (ts as i64);
                if skew_ms.unsigned_abs() > dmesh_proto::constants::MAX_SKEW_MS as u64 {
                    return Err(CryptoError::TimestampSkew {
                        skew_ms,
                        limit_ms: dmesh_proto::constants::MAX_SKEW_MS,
                    });
                }
                Ok(())
            },
            ValidityMode::DelayTolerant { now } => {
                let deadline = exp.unwrap_or_else(|| ts.saturating_add(dmesh_proto::constants::DEFAULT_TTL_MS));
                if *now > deadline {
                    return Err(CryptoError::MessageExpired { exp: deadline, now: *now });
                }
                Ok(())
            },
        }
    }
}

/// How `decrypt` treats the sender's observed signing/box keys against the
/// caller's prior knowledge of that contact (trust-on-first-use).
///
/// An explicit policy argument rather than nullable expected-key
/// parameters; the underlying contract is unchanged either way: compare
/// both keys, fail closed on any mismatch.
pub enum SenderPolicy<'a> {
    /// No prior relationship: accept whatever keys the envelope carries.
    /// The caller is expected to save a contact for the observed
    /// `(sender_fp, sender_sign_pk, sender_box_pk)` if it wants future
    /// messages from this sender pinned.
    TrustOnFirstUse,
    /// A known contact: the envelope's sender signing and box keys must
    /// match exactly, or decryption fails closed with
    /// [`CryptoError::SenderKeyMismatch`].
    RequireKnownContact {
        /// The contact's previously recorded signing public key.
        sign_pk: &'a [u8; 32],
        /// The contact's previously recorded box public key.
        box_pk: &'a [u8; 32],
    },
}

impl SenderPolicy<'_> {
    /// Check the envelope's observed sender keys against this policy.
    pub fn check(&self, observed_sign_pk: &[u8; 32], observed_box_pk: &[u8; 32]) -> Result<(), CryptoError> {
        match self {
            SenderPolicy::TrustOnFirstUse => Ok(()),
            SenderPolicy::RequireKnownContact { sign_pk, box_pk } => {
                if observed_sign_pk == *sign_pk && observed_box_pk == *box_pk {
                    Ok(())
                } else {
                    Err(CryptoError::SenderKeyMismatch)
                }
            },
        }
    }
}

/// Replay-protection seam `decrypt` calls after signature verification but
/// before opening the box, so a forged envelope never consumes a slot in
/// the caller's seen-set.
///
/// Implementations must make `check_and_mark` atomic: concurrent calls with
/// the same `(msg_id, sender_fp)` pair must result in exactly one success.
/// `dmesh-store`'s `Store` implementations satisfy this; tests may use a
/// simple `HashSet`-backed implementation.
pub trait ReplayCheck {
    /// Error type surfaced when the underlying check itself fails (not when
    /// a replay is detected, which is reported as `Ok(false)`).
    type Error: std::fmt::Display;

    /// Atomically check whether `(msg_id, sender_fp)` has been seen before
    /// and, if not, mark it seen. Returns `Ok(true)` if this is the first
    /// time the pair has been observed, `Ok(false)` if it is a replay.
    fn check_and_mark(&mut self, msg_id: &[u8; 32], sender_fp: &Fingerprint) -> Result<bool, Self::Error>;
}
