//! Tunables for a [`crate::SyncSession`] that are left to the embedding
//! application (inventory cap, want-selection byte budget, per-peer session
//! rate limit).

/// Per-session configuration. Defaults are generous enough for a direct
/// peer-to-peer exchange over any low-bandwidth carrier (QR/SMS/LoRa/BLE)
/// while still bounding worst-case memory use.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound on inventory items offered per session, independent of
    /// whatever the peer additionally advertises via `max_inv_count`.
    pub inventory_cap: u32,
    /// This peer's own byte budget for a `sync-get` request, before it is
    /// further bounded by the data-sender's advertised capability.
    pub want_budget_bytes: u32,
    /// Maximum sync sessions this peer will accept from a single
    /// fingerprint within a one-minute window.
    pub max_sessions_per_minute: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inventory_cap: 500,
            want_budget_bytes: 256 * 1024,
            max_sessions_per_minute: 10,
        }
    }
}
