//! The five-phase sync session state machine.
//!
//! Methods take inputs and the current time and return a `Vec<SyncAction>`
//! for a driver to execute; the state machine itself performs no I/O. The
//! I/O a real driver must perform is frame transport, outbox/inbox/seen/
//! forwarded-set reads and writes, and envelope decryption. None of that
//! is touched directly here, so the session stays synchronous and
//! unit-testable without a transport or a store.
//!
//! ```text
//! Idle → HelloSent ↔ HelloRcvd → InvSent ↔ InvRcvd
//!      → GetSent   ↔ DataRcvd  → AckSent ↔ AckRcvd → Complete
//! ```
//! Either peer may drive the GET/DATA/ACK leg; the symmetric leg runs in
//! parallel, so this session tracks "sent" and "received" progress on each
//! phase independently rather than a single linear cursor.

use std::collections::{HashMap, HashSet};

use dmesh_crypto::SigningKeyPair;
use dmesh_proto::{
    Capabilities, Chunk, DataUnit, InvItem, MessageEnvelope, SyncAck, SyncData, SyncGet, SyncHello,
    SyncInv,
    primitives::{b64_decode_fixed, b64_encode},
};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::inventory::{self, InventoryCandidate};
use crate::want;

/// What this session learned about its peer from a verified `sync-hello`.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    /// Base64-encoded fingerprint the peer claims.
    pub fp: String,
    /// The peer's raw Ed25519 signing public key.
    pub sign_pk: [u8; 32],
    /// The peer's advertised capabilities.
    pub capabilities: Capabilities,
}

/// Coarse session progress, derived from independent sent/received flags
/// for display and error reporting. Gating logic uses the flags directly,
/// not this enum, since the GET/DATA/ACK leg runs symmetrically in both
/// directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No frame sent or received yet.
    Idle,
    /// This side's `sync-hello` sent, peer's not yet received.
    HelloSent,
    /// Peer's `sync-hello` received and verified.
    HelloRcvd,
    /// This side's `sync-inv` sent, peer's not yet received.
    InvSent,
    /// Peer's `sync-inv` received and wants selected.
    InvRcvd,
    /// This side's `sync-get` sent.
    GetSent,
    /// Peer's `sync-data` received and (re)assembled.
    DataRcvd,
    /// This side's `sync-ack` sent.
    AckSent,
    /// Peer's `sync-ack` received.
    AckRcvd,
    /// Both sides have sent and received an ack; the session is done.
    Complete,
    /// The session aborted; no further frames should be processed.
    Aborted,
}

/// One outbound frame a driver must serialize and send to the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncFrame {
    /// `sync-hello`.
    Hello(SyncHello),
    /// `sync-inv`.
    Inv(SyncInv),
    /// `sync-get`.
    Get(SyncGet),
    /// `sync-data`.
    Data(SyncData),
    /// `sync-ack`.
    Ack(SyncAck),
}

/// An action a [`SyncSession`] method returns for its driver to execute.
///
/// The session never performs I/O itself (no transport send, no store
/// read/write, no decryption): those are exactly the operations a driver
/// must carry out in response to these actions.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Serialize and send this frame to the peer.
    SendFrame(SyncFrame),
    /// Hand this envelope to `dmesh-crypto::decrypt` and, on success, to the
    /// inbox via the seen-set check; the driver decides whether a decrypt
    /// failure aborts the session or is merely logged.
    DeliverEnvelope(MessageEnvelope),
    /// Record that `msg_id` has been forwarded to `peer_fp`:
    /// `ForwardedStore::mark_forwarded(peer_fp, msg_id)`.
    MarkForwarded {
        /// Base64-encoded fingerprint of the peer that acknowledged receipt.
        peer_fp: String,
        /// Base64-encoded message id that was acknowledged.
        msg_id: String,
    },
    /// Abort the session without further state change: signature/format
    /// errors abort with no writes beyond logging.
    Abort {
        /// Human-readable reason, for logging.
        reason: String,
    },
}

/// A single peer-to-peer sync session.
///
/// One instance is created per connected peer per session; it is not
/// reused across sessions (each session gets a fresh rate-limit check from
/// [`crate::rate_limit::SessionRateLimiter`] before construction).
pub struct SyncSession {
    own_fp: String,
    own_sign_pk: [u8; 32],
    own_capabilities: Capabilities,
    config: SyncConfig,
    peer: Option<PeerInfo>,
    sent_hello: bool,
    received_hello: bool,
    sent_inv: bool,
    received_inv: bool,
    sent_get: bool,
    received_get: bool,
    sent_data: bool,
    received_data: bool,
    sent_ack: bool,
    received_ack: bool,
    received_msg_ids: Vec<String>,
    aborted: bool,
}

impl SyncSession {
    /// Start a new session as `own_fp`/`own_sign_pk`, advertising
    /// `own_capabilities`.
    #[must_use]
    pub fn new(
        own_fp: String,
        own_sign_pk: [u8; 32],
        own_capabilities: Capabilities,
        config: SyncConfig,
    ) -> Self {
        Self {
            own_fp,
            own_sign_pk,
            own_capabilities,
            config,
            peer: None,
            sent_hello: false,
            received_hello: false,
            sent_inv: false,
            received_inv: false,
            sent_get: false,
            received_get: false,
            sent_data: false,
            received_data: false,
            sent_ack: false,
            received_ack: false,
            received_msg_ids: Vec::new(),
            aborted: false,
        }
    }

    /// The verified peer this session is talking to, once its `sync-hello`
    /// has been received.
    #[must_use]
    pub fn peer(&self) -> Option<&PeerInfo> {
        self.peer.as_ref()
    }

    /// This session's coarse progress, for logging and tests.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.aborted {
            return Phase::Aborted;
        }
        if self.sent_ack && self.received_ack {
            return Phase::Complete;
        }
        if self.received_ack {
            return Phase::AckRcvd;
        }
        if self.sent_ack {
            return Phase::AckSent;
        }
        if self.received_data {
            return Phase::DataRcvd;
        }
        if self.sent_get {
            return Phase::GetSent;
        }
        if self.received_inv {
            return Phase::InvRcvd;
        }
        if self.sent_inv {
            return Phase::InvSent;
        }
        if self.received_hello {
            return Phase::HelloRcvd;
        }
        if self.sent_hello {
            return Phase::HelloSent;
        }
        Phase::Idle
    }

    /// Whether both directions of the ack leg have completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sent_ack && self.received_ack
    }

    fn unexpected(&self) -> SyncError {
        SyncError::UnexpectedFrame { state: format!("{:?}", self.phase()) }
    }

    fn require_peer(&self) -> Result<PeerInfo, SyncError> {
        self.peer.clone().ok_or_else(|| self.unexpected())
    }

    /// Initiate the session: build and sign this side's `sync-hello`.
    pub fn start(&mut self, signing_key: &SigningKeyPair, now: u64) -> Vec<SyncAction> {
        if self.sent_hello {
            return Vec::new();
        }
        let mut hello = SyncHello {
            v: 1,
            kind: SyncHello::KIND.to_string(),
            ts: now,
            peer_fp: self.own_fp.clone(),
            peer_sign_pk: b64_encode(&self.own_sign_pk),
            capabilities: self.own_capabilities.clone(),
            signature: String::new(),
        };
        hello.signature = b64_encode(&signing_key.sign(&hello.signable_bytes()));
        self.sent_hello = true;
        vec![SyncAction::SendFrame(SyncFrame::Hello(hello))]
    }

    /// Process an inbound `sync-hello`: verify its signature and that
    /// `peer_fp == fingerprint(peer_sign_pk)`, then record the peer.
    pub fn receive_hello(&mut self, frame: &SyncHello, _now: u64) -> Result<Vec<SyncAction>, SyncError> {
        if !self.sent_hello || self.received_hello {
            return Err(self.unexpected());
        }
        frame.check_format().map_err(|e| SyncError::InvalidFrame { reason: e.to_string() })?;

        let sign_pk = decode_pk(&frame.peer_sign_pk)?;
        let computed_fp = dmesh_crypto::derive_fingerprint(&sign_pk);
        if b64_encode(&computed_fp) != frame.peer_fp {
            return Err(SyncError::FingerprintMismatch);
        }
        verify_frame_signature(&sign_pk, &frame.signable_bytes(), &frame.signature)?;

        self.peer = Some(PeerInfo {
            fp: frame.peer_fp.clone(),
            sign_pk,
            capabilities: frame.capabilities.clone(),
        });
        self.received_hello = true;
        Ok(Vec::new())
    }

    /// Build and sign this side's `sync-inv` from a snapshot of outbox
    /// candidates. `forwarded_to_peer` must be the set of `msg_id`s already
    /// known to be forwarded to this peer (`ForwardedStore::forwarded_to`).
    pub fn build_inventory(
        &mut self,
        candidates: &[InventoryCandidate],
        forwarded_to_peer: &HashSet<String>,
        now: u64,
        signing_key: &SigningKeyPair,
    ) -> Result<Vec<SyncAction>, SyncError> {
        let peer = self.require_peer()?;
        if self.sent_inv {
            return Err(self.unexpected());
        }

        let items = inventory::build_inventory(
            candidates,
            &peer.fp,
            forwarded_to_peer,
            now,
            peer.capabilities.max_inv_count,
            self.config.inventory_cap,
        );

        let mut inv = SyncInv {
            v: 1,
            kind: SyncInv::KIND.to_string(),
            ts: now,
            items,
            bloom: None,
            signature: String::new(),
        };
        inv.signature = b64_encode(&signing_key.sign(&inv.signable_bytes()));
        self.sent_inv = true;
        Ok(vec![SyncAction::SendFrame(SyncFrame::Inv(inv))])
    }

    /// Process an inbound `sync-inv`: validate it, select a bounded want
    /// list, and build the `sync-get` response. `already_seen` must contain
    /// every advertised `msg_id` already present in the local seen-set.
    pub fn receive_inv(
        &mut self,
        frame: &SyncInv,
        already_seen: &HashSet<String>,
        now: u64,
        signing_key: &SigningKeyPair,
    ) -> Result<Vec<SyncAction>, SyncError> {
        let peer = self.require_peer()?;
        if self.received_inv {
            return Err(self.unexpected());
        }
        frame.check_format().map_err(|e| SyncError::InvalidFrame { reason: e.to_string() })?;
        verify_frame_signature(&peer.sign_pk, &frame.signable_bytes(), &frame.signature)?;

        if frame.items.len() as u32 > peer.capabilities.max_inv_count {
            return Err(SyncError::LimitExceeded {
                field: "items",
                actual: frame.items.len(),
                limit: peer.capabilities.max_inv_count as usize,
            });
        }
        self.received_inv = true;

        let live: Vec<InvItem> = frame.items.iter().filter(|i| i.exp >= now).cloned().collect();
        let advertised_cap =
            peer.capabilities.max_msg_size.saturating_mul(peer.capabilities.max_chunks.max(1));
        let budget = self.config.want_budget_bytes.min(advertised_cap);
        let want = want::select_want(&live, already_seen, budget);

        let mut get = SyncGet {
            v: 1,
            kind: SyncGet::KIND.to_string(),
            ts: now,
            want,
            max_bytes: budget,
            signature: String::new(),
        };
        get.signature = b64_encode(&signing_key.sign(&get.signable_bytes()));
        self.sent_get = true;
        Ok(vec![SyncAction::SendFrame(SyncFrame::Get(get))])
    }

    /// Process an inbound `sync-get`: resolve each requested `msg_id` via
    /// `resolve` (typically an outbox lookup), chunking anything larger
    /// than the peer's `max_msg_size`, and build the `sync-data` response,
    /// capped at the peer's `max_chunks` and the peer's own declared
    /// `max_bytes`.
    pub fn receive_get(
        &mut self,
        frame: &SyncGet,
        resolve: impl Fn(&str) -> Option<MessageEnvelope>,
        now: u64,
        signing_key: &SigningKeyPair,
    ) -> Result<Vec<SyncAction>, SyncError> {
        let peer = self.require_peer()?;
        if self.received_get {
            return Err(self.unexpected());
        }
        frame.check_format().map_err(|e| SyncError::InvalidFrame { reason: e.to_string() })?;
        verify_frame_signature(&peer.sign_pk, &frame.signable_bytes(), &frame.signature)?;

        if frame.want.len() as u32 > self.config.inventory_cap {
            return Err(SyncError::LimitExceeded {
                field: "items",
                actual: frame.want.len(),
                limit: self.config.inventory_cap as usize,
            });
        }
        self.received_get = true;

        let mut units: Vec<DataUnit> = Vec::new();
        let mut total_bytes: u64 = 0;
        let mut unit_count: u32 = 0;
        let budget = u64::from(frame.max_bytes);

        for msg_id in &frame.want {
            if unit_count >= peer.capabilities.max_chunks {
                break;
            }
            let Some(envelope) = resolve(msg_id) else { continue };
            let size = envelope
                .to_json_bytes()
                .map_err(|e| SyncError::InvalidFrame { reason: e.to_string() })?
                .len() as u64;
            if total_bytes + size > budget {
                continue;
            }

            if size as usize > peer.capabilities.max_msg_size as usize {
                let chunks = dmesh_chunker::chunk(&envelope, peer.capabilities.max_msg_size as usize)
                    .map_err(|e| SyncError::ReassemblyFailed { reason: e.to_string() })?;
                for chunk in chunks {
                    if unit_count >= peer.capabilities.max_chunks {
                        break;
                    }
                    units.push(DataUnit::Chunk(chunk));
                    unit_count += 1;
                }
            } else {
                units.push(DataUnit::Envelope(envelope));
                unit_count += 1;
            }
            total_bytes += size;
        }

        let mut data = SyncData {
            v: 1,
            kind: SyncData::KIND.to_string(),
            ts: now,
            messages: units,
            signature: String::new(),
        };
        data.signature = b64_encode(&signing_key.sign(&data.signable_bytes()));
        self.sent_data = true;
        Ok(vec![SyncAction::SendFrame(SyncFrame::Data(data))])
    }

    /// Process an inbound `sync-data`: reassemble any chunk groups, and
    /// emit a [`SyncAction::DeliverEnvelope`] per resulting envelope. The
    /// driver is responsible for actually decrypting and storing each one;
    /// this method only reconstructs the wire envelopes and tracks their
    /// ids for the eventual `sync-ack`.
    pub fn receive_data(&mut self, frame: &SyncData, _now: u64) -> Result<Vec<SyncAction>, SyncError> {
        let peer = self.require_peer()?;
        if self.received_data {
            return Err(self.unexpected());
        }
        frame.check_format().map_err(|e| SyncError::InvalidFrame { reason: e.to_string() })?;
        verify_frame_signature(&peer.sign_pk, &frame.signable_bytes(), &frame.signature)?;

        if frame.messages.len() as u32 > self.own_capabilities.max_chunks {
            return Err(SyncError::LimitExceeded {
                field: "messages",
                actual: frame.messages.len(),
                limit: self.own_capabilities.max_chunks as usize,
            });
        }
        self.received_data = true;

        let mut chunk_groups: HashMap<String, Vec<Chunk>> = HashMap::new();
        let mut envelopes: Vec<MessageEnvelope> = Vec::new();
        for unit in &frame.messages {
            match unit {
                DataUnit::Envelope(env) => envelopes.push(env.clone()),
                DataUnit::Chunk(chunk) => {
                    chunk_groups.entry(chunk.msg_id.clone()).or_default().push(chunk.clone());
                },
            }
        }
        for chunks in chunk_groups.into_values() {
            let envelope = dmesh_chunker::reassemble(&chunks)
                .map_err(|e| SyncError::ReassemblyFailed { reason: e.to_string() })?;
            envelopes.push(envelope);
        }

        let mut actions = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            let msg_id = envelope_msg_id(&envelope)?;
            self.received_msg_ids.push(msg_id);
            actions.push(SyncAction::DeliverEnvelope(envelope));
        }
        Ok(actions)
    }

    /// Build and sign this side's `sync-ack`, listing every `msg_id`
    /// reassembled so far via [`Self::receive_data`].
    pub fn build_ack(&mut self, now: u64, signing_key: &SigningKeyPair) -> Result<Vec<SyncAction>, SyncError> {
        if !self.received_data || self.sent_ack {
            return Err(self.unexpected());
        }
        let mut ack = SyncAck {
            v: 1,
            kind: SyncAck::KIND.to_string(),
            ts: now,
            received: self.received_msg_ids.clone(),
            signature: String::new(),
        };
        ack.signature = b64_encode(&signing_key.sign(&ack.signable_bytes()));
        self.sent_ack = true;
        Ok(vec![SyncAction::SendFrame(SyncFrame::Ack(ack))])
    }

    /// Process an inbound `sync-ack`: emit a [`SyncAction::MarkForwarded`]
    /// per acknowledged `msg_id`.
    pub fn receive_ack(&mut self, frame: &SyncAck, _now: u64) -> Result<Vec<SyncAction>, SyncError> {
        let peer = self.require_peer()?;
        if self.received_ack {
            return Err(self.unexpected());
        }
        frame.check_format().map_err(|e| SyncError::InvalidFrame { reason: e.to_string() })?;
        verify_frame_signature(&peer.sign_pk, &frame.signable_bytes(), &frame.signature)?;

        if frame.received.len() as u32 > self.config.inventory_cap {
            return Err(SyncError::LimitExceeded {
                field: "items",
                actual: frame.received.len(),
                limit: self.config.inventory_cap as usize,
            });
        }
        self.received_ack = true;

        Ok(frame
            .received
            .iter()
            .map(|msg_id| SyncAction::MarkForwarded { peer_fp: peer.fp.clone(), msg_id: msg_id.clone() })
            .collect())
    }

    /// Abort the session. Transport/format errors abort without setting
    /// forwarded flags or writing partial state.
    pub fn abort(&mut self, reason: impl Into<String>) -> Vec<SyncAction> {
        self.aborted = true;
        vec![SyncAction::Abort { reason: reason.into() }]
    }
}

fn decode_pk(s: &str) -> Result<[u8; 32], SyncError> {
    b64_decode_fixed::<32>(s).map_err(|e| SyncError::InvalidFrame { reason: e.to_string() })
}

fn verify_frame_signature(sign_pk: &[u8; 32], signable_bytes: &[u8], signature_b64: &str) -> Result<(), SyncError> {
    let signature = b64_decode_fixed::<64>(signature_b64)
        .map_err(|e| SyncError::InvalidFrame { reason: e.to_string() })?;
    dmesh_crypto::verify_signature(sign_pk, signable_bytes, &signature)
        .map_err(|_| SyncError::SignatureInvalid)
}

fn envelope_msg_id(envelope: &MessageEnvelope) -> Result<String, SyncError> {
    if let Some(id) = &envelope.msg_id {
        return Ok(id.clone());
    }
    let decoded =
        envelope.decode().map_err(|e| SyncError::InvalidFrame { reason: e.to_string() })?;
    Ok(b64_encode(&dmesh_crypto::derive_message_id(&decoded.ciphertext)))
}
