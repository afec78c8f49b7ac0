//! The abstract [`Transport`] capability and [`Capabilities`] descriptor.

use dmesh_proto::MessageEnvelope;

use crate::error::TransportError;

/// What a transport can and cannot do, used by [`crate::manager::TransportManager`]
/// to pick a carrier and by callers to size payloads correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Largest single unit this transport can carry, in bytes.
    pub max_payload_size: usize,
    /// Whether oversized envelopes can be split into multiple units.
    pub supports_chunking: bool,
    /// Whether both parties can use this transport to both send and receive.
    pub bidirectional: bool,
    /// Whether delivery is effectively immediate when both parties are
    /// actively using the transport.
    pub realtime: bool,
    /// Whether this transport functions without any network connectivity.
    pub offline: bool,
    /// Whether this transport can discover peers on its own, without an
    /// out-of-band exchange.
    pub peer_discovery: bool,
}

/// A carrier capable of moving serialized dmesh units between devices.
///
/// Implementations are behavioral adapters over a physical carrier
/// (clipboard, QR code, file); none of them perform their own camera,
/// network, or filesystem I/O. That is left to the embedding application,
/// with concrete carriers treated as external collaborators the core only
/// consumes a thin capability from.
pub trait Transport {
    /// Stable, human-readable name (e.g. `"clipboard"`, `"qr"`, `"file"`).
    fn name(&self) -> &'static str;

    /// What this transport supports.
    fn capabilities(&self) -> Capabilities;

    /// Serialize an envelope into one or more transportable units. More
    /// than one unit is returned only when the envelope exceeds
    /// `capabilities().max_payload_size` and `supports_chunking` is true.
    fn send(&self, envelope: &MessageEnvelope) -> Result<Vec<String>, TransportError>;

    /// Poll the carrier for newly arrived, complete envelopes. Transports
    /// that are event-driven rather than pollable (e.g. QR, which depends
    /// on an external scanner feeding [`crate::qr::QrTransport::process_scanned`])
    /// always return an empty vector here.
    fn receive(&mut self) -> Result<Vec<MessageEnvelope>, TransportError>;

    /// Begin actively watching the carrier for inbound data, if this
    /// transport supports background listening. A no-op for transports
    /// that are purely synchronous (file).
    fn start_listening(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Stop watching the carrier. A no-op where [`Self::start_listening`] is.
    fn stop_listening(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Whether the underlying carrier can be used right now.
    fn is_available(&self) -> bool;
}
