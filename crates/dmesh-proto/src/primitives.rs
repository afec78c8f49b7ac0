//! Byte-level utilities used by the signing-byte construction and wire codec.
//!
//! All functions here are pure and allocation-minimal; they exist because
//! [`crate::envelope`]'s `SignBytes` construction is byte-exact and must
//! never drift between implementations.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::DmeshError;

/// Encode a `u32` as 4 big-endian bytes.
pub fn u32be(n: u32) -> [u8; 4] {
    n.to_be_bytes()
}

/// Encode a `u64` as 8 big-endian bytes.
///
/// Millisecond timestamps fit well within 2^53, so this never loses
/// precision when the value originated from an `f64`-based clock.
pub fn u64be(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

/// Concatenate byte slices into one owned buffer, preserving order.
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

/// Base64-encode bytes using the standard, padded alphabet.
pub fn b64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Base64-decode a string using the standard, padded alphabet.
pub fn b64_decode(s: &str) -> Result<Vec<u8>, DmeshError> {
    STANDARD.decode(s).map_err(|e| DmeshError::Base64DecodeFailed { reason: e.to_string() })
}

/// Decode a base64 field into a fixed-length array, checking that the
/// decoded length matches exactly.
pub fn b64_decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], DmeshError> {
    let decoded = b64_decode(s)?;
    if decoded.len() != N {
        return Err(DmeshError::InvalidKeyLength { expected: N, actual: decoded.len() });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&decoded);
    Ok(out)
}
