//! Splitting an envelope into transport-sized chunks and reassembling them.

use dmesh_proto::{Chunk, MessageEnvelope, primitives::b64_encode};
use sha2::{Digest, Sha512};

use crate::error::ChunkerError;

fn message_id(ciphertext: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(ciphertext);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

/// Split `envelope` into chunks no larger than `max_chunk_size` bytes each,
/// once JSON-serialized. Each chunk carries `message_id(envelope.ciphertext)`
/// so a receiver can bind reassembled chunks back to the ciphertext they
/// came from, independent of the signature check that happens after
/// reassembly.
pub fn chunk(envelope: &MessageEnvelope, max_chunk_size: usize) -> Result<Vec<Chunk>, ChunkerError> {
    let data_size = max_chunk_size
        .checked_sub(dmesh_proto::CHUNK_OVERHEAD)
        .filter(|&n| n > 0)
        .ok_or(ChunkerError::ChunkSizeTooSmall {
            max_chunk_size,
            overhead: dmesh_proto::CHUNK_OVERHEAD,
        })?;

    let decoded = envelope
        .decode()
        .map_err(|e| ChunkerError::MalformedEnvelope { reason: e.to_string() })?;
    let msg_id = message_id(&decoded.ciphertext);
    let msg_id_b64 = b64_encode(&msg_id);

    let json = envelope.to_json().map_err(|e| ChunkerError::MalformedEnvelope { reason: e.to_string() })?;
    let bytes = json.as_bytes();

    let total = bytes.len().div_ceil(data_size) as u32;
    let total = total.max(1);

    let chunks = bytes
        .chunks(data_size)
        .enumerate()
        .map(|(seq, slice)| Chunk {
            v: 1,
            kind: Chunk::KIND.to_string(),
            msg_id: msg_id_b64.clone(),
            seq: seq as u32,
            total,
            data: b64_encode(slice),
        })
        .collect();

    Ok(chunks)
}

/// Reassemble a complete set of chunks back into the original
/// [`MessageEnvelope`] they were split from.
///
/// Requires exactly `total` chunks, consecutive sequence numbers in
/// `[0, total)`, and an identical `msg_id` across every chunk. Chunks
/// themselves carry no signature; integrity rests on verifying the
/// reassembled envelope's own signature afterward.
pub fn reassemble(chunks: &[Chunk]) -> Result<MessageEnvelope, ChunkerError> {
    if chunks.is_empty() {
        return Err(ChunkerError::IncompleteChunks { expected: 0, got: 0 });
    }

    let msg_id = &chunks[0].msg_id;
    let total = chunks[0].total;
    if chunks.iter().any(|c| &c.msg_id != msg_id) {
        return Err(ChunkerError::MessageIdMismatch);
    }
    if chunks.len() as u32 != total {
        return Err(ChunkerError::IncompleteChunks { expected: total, got: chunks.len() as u32 });
    }

    let mut sorted: Vec<&Chunk> = chunks.iter().collect();
    sorted.sort_by_key(|c| c.seq);
    for (expected_seq, chunk) in sorted.iter().enumerate() {
        if chunk.seq != expected_seq as u32 {
            return Err(ChunkerError::MissingSequence { seq: expected_seq as u32 });
        }
    }

    let mut payload = Vec::new();
    for chunk in &sorted {
        let slice =
            chunk.decode_data().map_err(|e| ChunkerError::MalformedEnvelope { reason: e.to_string() })?;
        payload.extend_from_slice(&slice);
    }

    let json = String::from_utf8(payload)
        .map_err(|e| ChunkerError::MalformedEnvelope { reason: e.to_string() })?;
    MessageEnvelope::from_json(&json).map_err(|e| ChunkerError::MalformedEnvelope { reason: e.to_string() })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_envelope(ciphertext_len: usize) -> MessageEnvelope {
        let ciphertext = vec![0x5Au8; ciphertext_len];
        MessageEnvelope::new(
            Some([1u8; 32]),
            1_706_012_345_678,
            Some(1_706_617_145_678),
            &[2u8; 32],
            &[3u8; 32],
            &[4u8; 32],
            &[5u8; 32],
            &[6u8; 24],
            &ciphertext,
            &[7u8; 64],
        )
    }

    #[test]
    fn chunk_and_reassemble_round_trips_a_large_envelope() {
        let envelope = sample_envelope(5000);
        let chunks = chunk(&envelope, 512).unwrap();
        assert!(chunks.len() > 1);
        let reassembled = reassemble(&chunks).unwrap();
        assert_eq!(reassembled, envelope);
    }

    #[test]
    fn chunk_and_reassemble_round_trips_a_small_envelope_as_one_chunk() {
        let envelope = sample_envelope(10);
        let chunks = chunk(&envelope, 2048).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total, 1);
        let reassembled = reassemble(&chunks).unwrap();
        assert_eq!(reassembled, envelope);
    }

    #[test]
    fn all_chunks_share_msg_id_and_total() {
        let envelope = sample_envelope(3000);
        let chunks = chunk(&envelope, 256).unwrap();
        let msg_id = chunks[0].msg_id.clone();
        let total = chunks[0].total;
        for c in &chunks {
            assert_eq!(c.msg_id, msg_id);
            assert_eq!(c.total, total);
        }
    }

    #[test]
    fn rejects_chunk_size_smaller_than_overhead() {
        let envelope = sample_envelope(10);
        let err = chunk(&envelope, 50).unwrap_err();
        assert!(matches!(err, ChunkerError::ChunkSizeTooSmall { .. }));
    }

    #[test]
    fn reassemble_rejects_missing_chunk() {
        let envelope = sample_envelope(3000);
        let mut chunks = chunk(&envelope, 256).unwrap();
        chunks.remove(1);
        let err = reassemble(&chunks).unwrap_err();
        assert!(matches!(err, ChunkerError::IncompleteChunks { .. }));
    }

    #[test]
    fn reassemble_rejects_duplicated_sequence_with_missing_gap() {
        let envelope = sample_envelope(3000);
        let mut chunks = chunk(&envelope, 256).unwrap();
        let total = chunks.len();
        chunks[total - 1].seq = chunks[0].seq;
        let err = reassemble(&chunks).unwrap_err();
        assert!(matches!(err, ChunkerError::MissingSequence { .. }));
    }

    #[test]
    fn reassemble_rejects_mixed_message_ids() {
        let a = chunk(&sample_envelope(3000), 256).unwrap();
        let b = chunk(&sample_envelope(3000 + 1), 256).unwrap();
        let mut mixed = a;
        mixed.push(b[0].clone());
        let err = reassemble(&mixed).unwrap_err();
        assert!(matches!(err, ChunkerError::MessageIdMismatch | ChunkerError::IncompleteChunks { .. }));
    }

    #[test]
    fn chunks_are_not_individually_decodable_as_envelopes() {
        let envelope = sample_envelope(3000);
        let chunks = chunk(&envelope, 256).unwrap();
        assert_eq!(chunks[0].kind, "dmesh-chunk");
    }
}
