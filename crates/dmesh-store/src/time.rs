//! Wall-clock helper shared by the in-memory and redb backends.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix milliseconds.
///
/// # Panics
/// Panics if the system clock is set before the Unix epoch.
#[allow(clippy::expect_used)]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as u64
}
