//! Per-peer sync session rate limiting.

use std::collections::{HashMap, VecDeque};

use crate::error::SyncError;

/// Tracks recent session starts per peer fingerprint in a sliding window,
/// rejecting new sessions once a peer exceeds its allowance.
///
/// This is deliberately a plain in-process structure, not a store table:
/// rate limiting is a local defensive measure against a single misbehaving
/// peer within one process's lifetime, not state that needs to survive a
/// restart or be shared across devices.
#[derive(Debug, Clone)]
pub struct SessionRateLimiter {
    window_ms: u64,
    max_per_window: u32,
    history: HashMap<String, VecDeque<u64>>,
}

impl SessionRateLimiter {
    /// Build a limiter allowing `max_per_window` session starts per peer
    /// within any `window_ms` sliding window.
    #[must_use]
    pub fn new(max_per_window: u32, window_ms: u64) -> Self {
        Self { window_ms, max_per_window, history: HashMap::new() }
    }

    /// Build a limiter using the default unit: sessions per minute.
    #[must_use]
    pub fn per_minute(max_sessions: u32) -> Self {
        Self::new(max_sessions, 60_000)
    }

    /// Record a session start attempt from `peer_fp` at `now`, first
    /// evicting entries older than the window. Returns
    /// [`SyncError::RateLimited`] if this would exceed the allowance.
    pub fn check_and_record(&mut self, peer_fp: &str, now: u64) -> Result<(), SyncError> {
        let entry = self.history.entry(peer_fp.to_string()).or_default();
        while let Some(&oldest) = entry.front() {
            if now.saturating_sub(oldest) > self.window_ms {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() as u32 >= self.max_per_window {
            return Err(SyncError::RateLimited { count: entry.len() as u32 });
        }
        entry.push_back(now);
        Ok(())
    }
}
