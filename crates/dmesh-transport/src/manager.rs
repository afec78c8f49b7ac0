//! Registry and dispatcher over multiple [`Transport`]s.

use std::collections::HashMap;

use dmesh_proto::MessageEnvelope;
use tracing::warn;

use crate::error::TransportError;
use crate::transport::Transport;

/// Preference order used by [`TransportManager::send_best`] when the caller
/// has no specific transport in mind: clipboard, then QR, then file.
const PREFERENCE_ORDER: &[&str] = &["clipboard", "qr", "file"];

/// A message received through some registered transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedMessage {
    /// Name of the transport the message arrived on.
    pub transport: &'static str,
    /// The decoded envelope.
    pub envelope: MessageEnvelope,
}

/// An error surfaced by some registered transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedError {
    /// Name of the transport the error came from.
    pub transport: &'static str,
    /// The error itself.
    pub error: TransportError,
}

/// Holds a registry of `name -> Transport` and dispatches `send`/`receive`
/// across them, tagging every result with its originating transport.
#[derive(Default)]
pub struct TransportManager {
    transports: HashMap<&'static str, Box<dyn Transport>>,
}

impl TransportManager {
    /// Construct an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self { transports: HashMap::new() }
    }

    /// Register a transport, replacing any previous one under the same name.
    pub fn register(&mut self, transport: Box<dyn Transport>) {
        self.transports.insert(transport.name(), transport);
    }

    /// Names of every registered transport currently reporting itself
    /// available.
    #[must_use]
    pub fn available_transports(&self) -> Vec<&'static str> {
        self.transports
            .iter()
            .filter(|(_, t)| t.is_available())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Send through a specific named transport.
    ///
    /// # Errors
    /// Returns [`TransportError::UnknownTransport`] if no transport is
    /// registered under `name`.
    pub fn send_via(&self, name: &str, envelope: &MessageEnvelope) -> Result<Vec<String>, TransportError> {
        let transport = self
            .transports
            .get(name)
            .ok_or_else(|| TransportError::UnknownTransport { name: name.to_string() })?;
        transport.send(envelope)
    }

    /// Send through the best available transport, preferring clipboard over
    /// QR over file.
    ///
    /// # Errors
    /// Returns [`TransportError::NoTransportAvailable`] if nothing
    /// registered is currently available.
    pub fn send_best(&self, envelope: &MessageEnvelope) -> Result<(&'static str, Vec<String>), TransportError> {
        let name = PREFERENCE_ORDER
            .iter()
            .find(|name| {
                self.transports
                    .get(**name)
                    .is_some_and(|t| t.is_available())
            })
            .copied()
            .ok_or(TransportError::NoTransportAvailable)?;
        let units = self.send_via(name, envelope)?;
        Ok((name, units))
    }

    /// Poll every registered transport for new messages and errors,
    /// tagging each with its originating transport name.
    pub fn poll(&mut self) -> (Vec<TaggedMessage>, Vec<TaggedError>) {
        let mut messages = Vec::new();
        let mut errors = Vec::new();
        for (name, transport) in &mut self.transports {
            let name = *name;
            match transport.receive() {
                Ok(envelopes) => {
                    messages.extend(envelopes.into_iter().map(|envelope| TaggedMessage {
                        transport: name,
                        envelope,
                    }));
                }
                Err(error) => {
                    warn!(transport = %name, %error, "transport receive failed");
                    errors.push(TaggedError { transport: name, error });
                }
            }
        }
        (messages, errors)
    }
}
