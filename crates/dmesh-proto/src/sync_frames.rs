//! The five sync-session wire frames.
//!
//! Each frame carries an Ed25519 signature over the frame with the
//! `signature` field blanked. This module only defines the shapes and the
//! canonical "signable bytes" used to build/verify that signature; key
//! handling and actual signing live in `dmesh-sync`.

use serde::{Deserialize, Serialize};

use crate::{chunk::Chunk, envelope::MessageEnvelope};

/// Capabilities a peer advertises in its `sync-hello`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Largest single envelope this peer will accept unchunked.
    pub max_msg_size: u32,
    /// Largest inventory item count this peer will accept.
    pub max_inv_count: u32,
    /// Largest number of chunks/envelopes this peer will accept per `DATA`.
    pub max_chunks: u32,
    /// Payload `type` values this peer understands.
    pub supported_kinds: Vec<String>,
    /// Protocol version this peer speaks.
    pub protocol_version: u8,
}

/// One inventory item advertised in a `sync-inv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvItem {
    /// Base64-encoded [`crate::MessageId`].
    pub msg_id: String,
    /// Expiration time, Unix milliseconds.
    pub exp: u64,
    /// Serialized envelope size, in bytes.
    pub size: u32,
    /// Scheduling priority, 0 (bulk) to 5 (medical/critical).
    pub priority: u8,
}

macro_rules! sync_frame {
    ($name:ident, $signable:ident, $kind:expr, { $($field:ident : $ty:ty),* $(,)? }) => {
        #[doc = concat!("The `", $kind, "` sync frame.")]
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            /// Wire format version. Always `1`.
            pub v: u8,
            /// Wire kind discriminant.
            pub kind: String,
            /// Frame creation time, Unix milliseconds.
            pub ts: u64,
            $(
                #[doc = "See the struct-level frame description."]
                pub $field: $ty,
            )*
            /// Base64-encoded 64-byte detached Ed25519 signature over
            /// [`Self::signable_bytes`].
            pub signature: String,
        }

        #[derive(Serialize)]
        struct $signable<'a> {
            v: u8,
            kind: &'a str,
            ts: u64,
            $( $field: &'a $ty, )*
        }

        impl $name {
            /// Wire kind discriminant for this frame.
            pub const KIND: &'static str = $kind;

            /// The canonical bytes this frame's signature is computed over:
            /// the frame with `signature` removed.
            pub fn signable_bytes(&self) -> Vec<u8> {
                let signable = $signable {
                    v: self.v,
                    kind: &self.kind,
                    ts: self.ts,
                    $( $field: &self.$field, )*
                };
                // Field order is fixed by struct definition order, so this
                // is byte-stable across calls and across processes running
                // the same binary-compatible struct layout.
                serde_json::to_vec(&signable)
                    .unwrap_or_default()
            }

            /// Serialize to canonical JSON.
            pub fn to_json(&self) -> serde_json::Result<String> {
                serde_json::to_string(self)
            }

            /// Parse from JSON, checking `v`/`kind`.
            pub fn from_json(s: &str) -> Result<Self, crate::error::DmeshError> {
                let frame: Self = serde_json::from_str(s)
                    .map_err(|e| crate::error::DmeshError::JsonParseFailed { reason: e.to_string() })?;
                frame.check_format()?;
                Ok(frame)
            }

            /// `v == 1 && kind == "..."`.
            pub fn check_format(&self) -> Result<(), crate::error::DmeshError> {
                if self.v != 1 || self.kind != Self::KIND {
                    return Err(crate::error::DmeshError::InvalidMessageFormat {
                        reason: format!(
                            "expected v=1 kind={}, got v={} kind={}",
                            Self::KIND,
                            self.v,
                            self.kind
                        ),
                    });
                }
                Ok(())
            }
        }
    };
}

sync_frame!(SyncHello, SignableHello, "sync-hello", {
    peer_fp: String,
    peer_sign_pk: String,
    capabilities: Capabilities,
});

sync_frame!(SyncInv, SignableInv, "sync-inv", {
    items: Vec<InvItem>,
    bloom: Option<String>,
});

sync_frame!(SyncGet, SignableGet, "sync-get", {
    want: Vec<String>,
    max_bytes: u32,
});

/// One unit of data carried in a `sync-data` frame: a full envelope, or a
/// chunk of one that was too large for the peer's `max_msg_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataUnit {
    /// A complete, unchunked envelope.
    Envelope(MessageEnvelope),
    /// One chunk of an envelope too large to send whole.
    Chunk(Chunk),
}

sync_frame!(SyncData, SignableData, "sync-data", {
    messages: Vec<DataUnit>,
});

sync_frame!(SyncAck, SignableAck, "sync-ack", {
    received: Vec<String>,
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn caps() -> Capabilities {
        Capabilities {
            max_msg_size: 64 * 1024,
            max_inv_count: 500,
            max_chunks: 64,
            supported_kinds: vec!["text".to_string()],
            protocol_version: 1,
        }
    }

    #[test]
    fn hello_round_trips_through_json() {
        let hello = SyncHello {
            v: 1,
            kind: SyncHello::KIND.to_string(),
            ts: 1000,
            peer_fp: "fp".to_string(),
            peer_sign_pk: "pk".to_string(),
            capabilities: caps(),
            signature: "sig".to_string(),
        };
        let json = hello.to_json().unwrap();
        let parsed = SyncHello::from_json(&json).unwrap();
        assert_eq!(hello, parsed);
    }

    #[test]
    fn signable_bytes_excludes_signature() {
        let mut hello = SyncHello {
            v: 1,
            kind: SyncHello::KIND.to_string(),
            ts: 1000,
            peer_fp: "fp".to_string(),
            peer_sign_pk: "pk".to_string(),
            capabilities: caps(),
            signature: "sig-a".to_string(),
        };
        let bytes_a = hello.signable_bytes();
        hello.signature = "sig-b".to_string();
        let bytes_b = hello.signable_bytes();
        assert_eq!(bytes_a, bytes_b, "signable bytes must not depend on the signature field");
    }

    #[test]
    fn signable_bytes_changes_with_content() {
        let mut hello = SyncHello {
            v: 1,
            kind: SyncHello::KIND.to_string(),
            ts: 1000,
            peer_fp: "fp-a".to_string(),
            peer_sign_pk: "pk".to_string(),
            capabilities: caps(),
            signature: String::new(),
        };
        let bytes_a = hello.signable_bytes();
        hello.peer_fp = "fp-b".to_string();
        let bytes_b = hello.signable_bytes();
        assert_ne!(bytes_a, bytes_b);
    }

    #[test]
    fn data_unit_distinguishes_envelope_and_chunk() {
        let chunk = Chunk {
            v: 1,
            kind: Chunk::KIND.to_string(),
            msg_id: "id".to_string(),
            seq: 0,
            total: 1,
            data: "ZGF0YQ==".to_string(),
        };
        let unit = DataUnit::Chunk(chunk.clone());
        let json = serde_json::to_string(&unit).unwrap();
        let parsed: DataUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(unit, parsed);
        assert!(matches!(parsed, DataUnit::Chunk(c) if c == chunk));
    }

    #[test]
    fn rejects_wrong_kind() {
        let json = r#"{"v":1,"kind":"sync-get","ts":0,"want":[],"max_bytes":0,"signature":""}"#;
        assert!(SyncHello::from_json(json).is_err());
    }
}
