//! Sealing and opening of [`MessageEnvelope`]s.

use std::time::{SystemTime, UNIX_EPOCH};

use crypto_box::{
    SalsaBox,
    aead::{Aead, generic_array::GenericArray},
};
use dmesh_proto::{DecodedEnvelope, Fingerprint, MAX_BYTES, MessageEnvelope, Payload, PayloadContent};
use rand_core::{OsRng, RngCore};

use crate::{
    error::CryptoError,
    fingerprint::{fingerprint, message_id},
    keys::{BoxKeyPair, EphemeralBoxKeyPair, SigningKeyPair, verify_signature},
    policy::{ReplayCheck, SenderPolicy, ValidityMode},
    sign_bytes::{SignFields, sign_bytes},
};

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Inputs to [`encrypt`].
pub struct EncryptRequest<'a> {
    /// The plaintext payload content to seal.
    pub content: PayloadContent,
    /// The sender's long-term signing key pair.
    pub sender_signing: &'a SigningKeyPair,
    /// The sender's long-term box key pair.
    pub sender_box: &'a BoxKeyPair,
    /// The recipient's long-term box public key.
    pub recipient_box_pk: &'a [u8; 32],
    /// Creation time override, Unix milliseconds. Defaults to the current
    /// system time.
    pub ts: Option<u64>,
    /// Time-to-live override, milliseconds. Defaults to
    /// [`dmesh_proto::DEFAULT_TTL_MS`].
    pub ttl_ms: Option<u64>,
}

/// Seal `request.content` into a signed, encrypted [`MessageEnvelope`]
/// addressed to `request.recipient_box_pk`.
pub fn encrypt(request: EncryptRequest<'_>) -> Result<MessageEnvelope, CryptoError> {
    let ts = request.ts.unwrap_or_else(now_ms);
    let exp = ts.saturating_add(request.ttl_ms.unwrap_or(dmesh_proto::DEFAULT_TTL_MS));

    let payload = Payload::new(ts, request.content);
    let plaintext =
        payload.to_json_bytes().map_err(|e| CryptoError::JsonParseFailed { reason: e.to_string() })?;
    if plaintext.len() > MAX_BYTES {
        return Err(CryptoError::ContentTooLarge { size: plaintext.len(), limit: MAX_BYTES });
    }

    let ephemeral = EphemeralBoxKeyPair::generate();
    let mut nonce_bytes = [0u8; 24];
    OsRng.fill_bytes(&mut nonce_bytes);

    let recipient_public = x25519_dalek::PublicKey::from(*request.recipient_box_pk);
    let sealing_box = SalsaBox::new(&recipient_public, ephemeral.secret());
    let nonce = GenericArray::from_slice(&nonce_bytes);
    let ciphertext = sealing_box
        .encrypt(nonce, plaintext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let msg_id = message_id(&ciphertext);

    let sender_sign_pk = request.sender_signing.public_key_bytes();
    let sender_box_pk = request.sender_box.public_key_bytes();
    let eph_pk = ephemeral.public_key_bytes();
    let signable = sign_bytes(&SignFields {
        sender_sign_pk: &sender_sign_pk,
        sender_box_pk: &sender_box_pk,
        recipient_box_pk: request.recipient_box_pk,
        eph_pk: &eph_pk,
        nonce: &nonce_bytes,
        ts,
        ciphertext: &ciphertext,
    });
    let signature = request.sender_signing.sign(&signable);

    drop(ephemeral);

    Ok(MessageEnvelope::new(
        Some(msg_id),
        ts,
        Some(exp),
        &sender_sign_pk,
        &sender_box_pk,
        request.recipient_box_pk,
        &eph_pk,
        &nonce_bytes,
        &ciphertext,
        &signature,
    ))
}

/// The result of successfully opening an envelope.
#[derive(Debug, Clone)]
pub struct DecryptedMessage {
    /// The decoded plaintext payload.
    pub payload: Payload,
    /// Sender's Ed25519 signing public key, as observed on the envelope.
    pub sender_sign_pk: [u8; 32],
    /// Sender's X25519 box public key, as observed on the envelope.
    pub sender_box_pk: [u8; 32],
    /// `fingerprint(sender_sign_pk)`.
    pub sender_fp: Fingerprint,
    /// Envelope creation time, Unix milliseconds.
    pub ts: u64,
    /// The recomputed message id (`message_id(ciphertext)`).
    pub msg_id: [u8; 32],
}

/// Open and validate a [`MessageEnvelope`] against this party's box key
/// pair, a sender-identity policy, a validity mode, and a replay checker.
///
/// Validation runs in the mandatory ten-step order documented on each step
/// below; the first failing check returns without running later ones so a
/// message destined elsewhere (or forged) never reaches cryptographic
/// verification, and a forged replay never pollutes the seen-set.
pub fn decrypt<R: ReplayCheck>(
    env: &MessageEnvelope,
    recipient_box: &BoxKeyPair,
    sender_policy: &SenderPolicy<'_>,
    validity: ValidityMode,
    replay_check: &mut R,
) -> Result<DecryptedMessage, CryptoError> {
    // Steps 1-2: format, then decode and length-check every field.
    let decoded: DecodedEnvelope = env.decode().map_err(CryptoError::from)?;

    // Step 3: validity window.
    validity.check(decoded.ts, decoded.exp)?;

    // Step 4: message-id binding.
    let recomputed_msg_id = message_id(&decoded.ciphertext);
    if let Some(declared) = decoded.msg_id {
        if declared != recomputed_msg_id {
            return Err(CryptoError::MessageIdMismatch);
        }
    }

    // Step 5: recipient binding.
    if decoded.recipient_box_pk != recipient_box.public_key_bytes() {
        return Err(CryptoError::RecipientMismatch);
    }

    // Step 6: sender identity continuity.
    let sender_fp = fingerprint(&decoded.sender_sign_pk);
    sender_policy.check(&decoded.sender_sign_pk, &decoded.sender_box_pk)?;

    // Step 7: signature.
    let sign_fields = SignFields {
        sender_sign_pk: &decoded.sender_sign_pk,
        sender_box_pk: &decoded.sender_box_pk,
        recipient_box_pk: &decoded.recipient_box_pk,
        eph_pk: &decoded.eph_pk,
        nonce: &decoded.nonce,
        ts: decoded.ts,
        ciphertext: &decoded.ciphertext,
    };
    verify_signature(&decoded.sender_sign_pk, &sign_bytes(&sign_fields), &decoded.signature)?;

    // Step 8: replay check, atomic, only after signature verification.
    let first_seen = replay_check
        .check_and_mark(&recomputed_msg_id, &sender_fp)
        .map_err(|e| CryptoError::InvalidMessageFormat { reason: format!("replay check failed: {e}") })?;
    if !first_seen {
        return Err(CryptoError::ReplayDetected);
    }

    // Step 9: open the box.
    let eph_public = x25519_dalek::PublicKey::from(decoded.eph_pk);
    let opening_box = SalsaBox::new(&eph_public, recipient_box.secret());
    let nonce = GenericArray::from_slice(&decoded.nonce);
    let plaintext = opening_box
        .decrypt(nonce, decoded.ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    // Step 10: payload parse.
    let payload = Payload::from_json_bytes(&plaintext).map_err(CryptoError::from)?;

    Ok(DecryptedMessage {
        payload,
        sender_sign_pk: decoded.sender_sign_pk,
        sender_box_pk: decoded.sender_box_pk,
        sender_fp,
        ts: decoded.ts,
        msg_id: recomputed_msg_id,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use dmesh_proto::Urgency;

    use super::*;

    struct InMemoryReplay {
        seen: HashSet<([u8; 32], Fingerprint)>,
    }

    impl InMemoryReplay {
        fn new() -> Self {
            Self { seen: HashSet::new() }
        }
    }

    impl ReplayCheck for InMemoryReplay {
        type Error = std::convert::Infallible;

        fn check_and_mark(&mut self, msg_id: &[u8; 32], sender_fp: &Fingerprint) -> Result<bool, Self::Error> {
            Ok(self.seen.insert((*msg_id, *sender_fp)))
        }
    }

    #[test]
    fn round_trips_a_text_message() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let recipient_box = BoxKeyPair::generate();
        let recipient_pk = recipient_box.public_key_bytes();

        let env = encrypt(EncryptRequest {
            content: PayloadContent::Text { content: "Hello, Bob!".to_string() },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &recipient_pk,
            ts: Some(1_706_012_345_678),
            ttl_ms: None,
        })
        .unwrap();

        let mut replay = InMemoryReplay::new();
        let decrypted = decrypt(
            &env,
            &recipient_box,
            &SenderPolicy::TrustOnFirstUse,
            ValidityMode::Strict { now: 1_706_012_345_678 },
            &mut replay,
        )
        .unwrap();

        match decrypted.payload.content {
            PayloadContent::Text { content } => assert_eq!(content, "Hello, Bob!"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn round_trips_empty_content() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let recipient_box = BoxKeyPair::generate();
        let recipient_pk = recipient_box.public_key_bytes();

        let env = encrypt(EncryptRequest {
            content: PayloadContent::Text { content: String::new() },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &recipient_pk,
            ts: Some(0),
            ttl_ms: None,
        })
        .unwrap();

        let mut replay = InMemoryReplay::new();
        let decrypted = decrypt(
            &env,
            &recipient_box,
            &SenderPolicy::TrustOnFirstUse,
            ValidityMode::DelayTolerant { now: 0 },
            &mut replay,
        )
        .unwrap();
        match decrypted.payload.content {
            PayloadContent::Text { content } => assert_eq!(content, ""),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn round_trips_unicode_content() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let recipient_box = BoxKeyPair::generate();
        let recipient_pk = recipient_box.public_key_bytes();
        let text = "こんにちは🌏 help needed, 緊急!";

        let env = encrypt(EncryptRequest {
            content: PayloadContent::Text { content: text.to_string() },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &recipient_pk,
            ts: Some(0),
            ttl_ms: None,
        })
        .unwrap();

        let mut replay = InMemoryReplay::new();
        let decrypted = decrypt(
            &env,
            &recipient_box,
            &SenderPolicy::TrustOnFirstUse,
            ValidityMode::DelayTolerant { now: 0 },
            &mut replay,
        )
        .unwrap();
        match decrypted.payload.content {
            PayloadContent::Text { content } => assert_eq!(content, text),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn round_trips_a_large_message() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let recipient_box = BoxKeyPair::generate();
        let recipient_pk = recipient_box.public_key_bytes();
        let text = "A".repeat(1024);

        let env = encrypt(EncryptRequest {
            content: PayloadContent::Text { content: text.clone() },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &recipient_pk,
            ts: Some(0),
            ttl_ms: None,
        })
        .unwrap();

        let mut replay = InMemoryReplay::new();
        let decrypted = decrypt(
            &env,
            &recipient_box,
            &SenderPolicy::TrustOnFirstUse,
            ValidityMode::DelayTolerant { now: 0 },
            &mut replay,
        )
        .unwrap();
        match decrypted.payload.content {
            PayloadContent::Text { content } => assert_eq!(content, text),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn rejects_content_over_max_bytes() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let recipient_pk = BoxKeyPair::generate().public_key_bytes();
        let huge = "A".repeat(MAX_BYTES + 1);

        let err = encrypt(EncryptRequest {
            content: PayloadContent::Text { content: huge },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &recipient_pk,
            ts: Some(0),
            ttl_ms: None,
        })
        .unwrap_err();
        assert!(matches!(err, CryptoError::ContentTooLarge { .. }));
    }

    #[test]
    fn tampered_ciphertext_fails_signature_verification() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let recipient_box = BoxKeyPair::generate();
        let recipient_pk = recipient_box.public_key_bytes();

        let mut env = encrypt(EncryptRequest {
            content: PayloadContent::Text { content: "hi".to_string() },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &recipient_pk,
            ts: Some(0),
            ttl_ms: None,
        })
        .unwrap();

        let mut ct = dmesh_proto::primitives::b64_decode(&env.ciphertext).unwrap();
        ct[0] ^= 0xFF;
        env.ciphertext = dmesh_proto::primitives::b64_encode(&ct);

        let mut replay = InMemoryReplay::new();
        let err = decrypt(
            &env,
            &recipient_box,
            &SenderPolicy::TrustOnFirstUse,
            ValidityMode::DelayTolerant { now: 0 },
            &mut replay,
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::SignatureInvalid));
    }

    #[test]
    fn wrong_recipient_is_rejected_before_signature_check() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let intended_recipient = BoxKeyPair::generate();
        let wrong_recipient = BoxKeyPair::generate();

        let env = encrypt(EncryptRequest {
            content: PayloadContent::Text { content: "hi".to_string() },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &intended_recipient.public_key_bytes(),
            ts: Some(0),
            ttl_ms: None,
        })
        .unwrap();

        let mut replay = InMemoryReplay::new();
        let err = decrypt(
            &env,
            &wrong_recipient,
            &SenderPolicy::TrustOnFirstUse,
            ValidityMode::DelayTolerant { now: 0 },
            &mut replay,
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::RecipientMismatch));
    }

    #[test]
    fn replayed_envelope_is_rejected_on_second_decrypt() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let recipient_box = BoxKeyPair::generate();
        let recipient_pk = recipient_box.public_key_bytes();

        let env = encrypt(EncryptRequest {
            content: PayloadContent::Text { content: "hi".to_string() },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &recipient_pk,
            ts: Some(0),
            ttl_ms: None,
        })
        .unwrap();

        let mut replay = InMemoryReplay::new();
        decrypt(
            &env,
            &recipient_box,
            &SenderPolicy::TrustOnFirstUse,
            ValidityMode::DelayTolerant { now: 0 },
            &mut replay,
        )
        .unwrap();

        let err = decrypt(
            &env,
            &recipient_box,
            &SenderPolicy::TrustOnFirstUse,
            ValidityMode::DelayTolerant { now: 0 },
            &mut replay,
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::ReplayDetected));
    }

    #[test]
    fn known_contact_policy_rejects_unexpected_sender() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let recipient_box = BoxKeyPair::generate();
        let recipient_pk = recipient_box.public_key_bytes();

        let env = encrypt(EncryptRequest {
            content: PayloadContent::Text { content: "hi".to_string() },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &recipient_pk,
            ts: Some(0),
            ttl_ms: None,
        })
        .unwrap();

        let wrong_sign_pk = [0xAAu8; 32];
        let expected_box_pk = sender_box.public_key_bytes();
        let policy = SenderPolicy::RequireKnownContact { sign_pk: &wrong_sign_pk, box_pk: &expected_box_pk };

        let mut replay = InMemoryReplay::new();
        let err = decrypt(&env, &recipient_box, &policy, ValidityMode::DelayTolerant { now: 0 }, &mut replay)
            .unwrap_err();
        assert!(matches!(err, CryptoError::SenderKeyMismatch));
    }

    #[test]
    fn need_help_payload_round_trips() {
        let sender_signing = SigningKeyPair::generate().unwrap();
        let sender_box = BoxKeyPair::generate();
        let recipient_box = BoxKeyPair::generate();
        let recipient_pk = recipient_box.public_key_bytes();

        let env = encrypt(EncryptRequest {
            content: PayloadContent::NeedHelp {
                urgency: Urgency::Critical,
                people: Some(4),
                needs: Some(vec!["water".to_string()]),
            },
            sender_signing: &sender_signing,
            sender_box: &sender_box,
            recipient_box_pk: &recipient_pk,
            ts: Some(0),
            ttl_ms: None,
        })
        .unwrap();

        let mut replay = InMemoryReplay::new();
        let decrypted = decrypt(
            &env,
            &recipient_box,
            &SenderPolicy::TrustOnFirstUse,
            ValidityMode::DelayTolerant { now: 0 },
            &mut replay,
        )
        .unwrap();
        match decrypted.payload.content {
            PayloadContent::NeedHelp { urgency, people, .. } => {
                assert_eq!(urgency, Urgency::Critical);
                assert_eq!(people, Some(4));
            },
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
