//! The plaintext payload sealed inside a [`crate::envelope::MessageEnvelope`].

use serde::{Deserialize, Serialize};

/// Urgency level carried by `need_help` and `medical` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// No immediate danger.
    Low,
    /// Moderate concern.
    Medium,
    /// Serious, needs attention soon.
    High,
    /// Life-threatening, needs attention now.
    Critical,
}

/// The decoded plaintext payload carried inside a sealed message.
///
/// `v` and `ts` are carried alongside the tagged variant so a decoder can
/// recover the original envelope timestamp from inside the ciphertext even
/// if the outer envelope's `ts` field is later stripped by a relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Payload schema version. Always `1`.
    pub v: u8,
    /// Payload creation time, Unix milliseconds.
    pub ts: u64,
    /// The typed payload content.
    #[serde(flatten)]
    pub content: PayloadContent,
}

/// Recognized payload content shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadContent {
    /// Free-form text message. The default payload type.
    Text {
        /// The message body.
        content: String,
    },
    /// "I am safe" check-in, with no free text required.
    ImSafe {
        /// Optional accompanying note.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    /// A request for help.
    NeedHelp {
        /// How urgent the request is.
        urgency: Urgency,
        /// Number of people affected, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        people: Option<u32>,
        /// Specific needs, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        needs: Option<Vec<String>>,
    },
    /// Information about an available shelter.
    ShelterInfo {
        /// Where the shelter is.
        location: String,
        /// How many people it can hold, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        capacity: Option<u32>,
        /// Resources available at the shelter, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resources: Option<Vec<String>>,
    },
    /// A medical emergency report.
    Medical {
        /// How urgent the situation is.
        urgency: Urgency,
        /// Known conditions or injuries.
        conditions: Vec<String>,
        /// Number of people affected.
        people: u32,
    },
    /// An offer or request of physical supplies.
    Supplies {
        /// The kinds of supplies involved.
        resources: Vec<String>,
        /// Where the supplies are, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    /// Application-level acknowledgment of a prior message.
    Ack {
        /// The `msg_id` (base64) being acknowledged.
        #[serde(rename = "refMsgId")]
        ref_msg_id: String,
    },
}

impl PayloadContent {
    /// The wire `type` discriminant for this content, as it appears in JSON.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::ImSafe { .. } => "im_safe",
            Self::NeedHelp { .. } => "need_help",
            Self::ShelterInfo { .. } => "shelter_info",
            Self::Medical { .. } => "medical",
            Self::Supplies { .. } => "supplies",
            Self::Ack { .. } => "ack",
        }
    }
}

impl Payload {
    /// Build a payload envelope around typed content at the given time.
    pub fn new(ts: u64, content: PayloadContent) -> Self {
        Self { v: 1, ts, content }
    }

    /// Build a default `text` payload, the common case for `encrypt`.
    pub fn text(ts: u64, content: impl Into<String>) -> Self {
        Self::new(ts, PayloadContent::Text { content: content.into() })
    }

    /// Serialize to canonical, UTF-8-encoded JSON bytes.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse from UTF-8 JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, crate::error::DmeshError> {
        serde_json::from_slice(bytes)
            .map_err(|e| crate::error::DmeshError::JsonParseFailed { reason: e.to_string() })
    }
}
