//! Inventory construction: what to offer a peer in a `sync-inv` frame.
//!
//! Pure and storage-free: the driver reads the outbox (and the forwarded
//! set for this peer) and passes the result in as [`InventoryCandidate`]s,
//! so this module never touches `dmesh-store` directly.

use std::collections::HashSet;

use dmesh_proto::InvItem;

/// One outbox-derived candidate for inclusion in a `sync-inv` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryCandidate {
    /// Base64-encoded message id.
    pub msg_id: String,
    /// Expiration time, Unix milliseconds.
    pub exp: u64,
    /// Serialized envelope size, in bytes.
    pub size: u32,
    /// Scheduling priority (see [`crate::priority`]).
    pub priority: u8,
    /// Base64-encoded fingerprint of the envelope's original sender.
    pub sender_fp: String,
}

/// Build the `sync-inv` item list for `peer_fp` from a snapshot of outbox
/// candidates:
///
/// - drop anything already expired,
/// - drop anything authored by the peer itself (self-sent: they already
///   have it),
/// - drop anything already marked forwarded to this peer,
/// - sort by priority descending, then soonest-expiring first,
/// - truncate to `min(peer_max_inv_count, configured_cap)`.
#[must_use]
pub fn build_inventory(
    candidates: &[InventoryCandidate],
    peer_fp: &str,
    forwarded_to_peer: &HashSet<String>,
    now: u64,
    peer_max_inv_count: u32,
    configured_cap: u32,
) -> Vec<InvItem> {
    let mut surviving: Vec<&InventoryCandidate> = candidates
        .iter()
        .filter(|c| c.exp >= now)
        .filter(|c| c.sender_fp != peer_fp)
        .filter(|c| !forwarded_to_peer.contains(&c.msg_id))
        .collect();

    surviving.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.exp.cmp(&b.exp)));

    let cap = peer_max_inv_count.min(configured_cap) as usize;
    surviving.truncate(cap);

    surviving
        .into_iter()
        .map(|c| InvItem { msg_id: c.msg_id.clone(), exp: c.exp, size: c.size, priority: c.priority })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn candidate(msg_id: &str, exp: u64, priority: u8, sender_fp: &str) -> InventoryCandidate {
        InventoryCandidate { msg_id: msg_id.to_string(), exp, size: 100, priority, sender_fp: sender_fp.to_string() }
    }

    #[test]
    fn drops_expired_entries() {
        let candidates = vec![candidate("a", 50, 1, "other"), candidate("b", 150, 1, "other")];
        let items = build_inventory(&candidates, "peer", &HashSet::new(), 100, 100, 100);
        assert_eq!(items.iter().map(|i| i.msg_id.as_str()).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn drops_self_sent_entries() {
        let candidates = vec![candidate("a", 200, 1, "peer"), candidate("b", 200, 1, "other")];
        let items = build_inventory(&candidates, "peer", &HashSet::new(), 100, 100, 100);
        assert_eq!(items.iter().map(|i| i.msg_id.as_str()).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn drops_already_forwarded_entries() {
        let candidates = vec![candidate("a", 200, 1, "other"), candidate("b", 200, 1, "other")];
        let mut forwarded = HashSet::new();
        forwarded.insert("a".to_string());
        let items = build_inventory(&candidates, "peer", &forwarded, 100, 100, 100);
        assert_eq!(items.iter().map(|i| i.msg_id.as_str()).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn sorts_by_priority_then_soonest_expiry() {
        let candidates = vec![
            candidate("low", 500, 1, "other"),
            candidate("high-later", 500, 5, "other"),
            candidate("high-sooner", 300, 5, "other"),
        ];
        let items = build_inventory(&candidates, "peer", &HashSet::new(), 0, 100, 100);
        let ids: Vec<&str> = items.iter().map(|i| i.msg_id.as_str()).collect();
        assert_eq!(ids, vec!["high-sooner", "high-later", "low"]);
    }

    #[test]
    fn truncates_to_the_smaller_of_peer_cap_and_configured_cap() {
        let candidates: Vec<_> = (0..10).map(|i| candidate(&i.to_string(), 1000, 1, "other")).collect();
        let items = build_inventory(&candidates, "peer", &HashSet::new(), 0, 3, 100);
        assert_eq!(items.len(), 3);
        let items = build_inventory(&candidates, "peer", &HashSet::new(), 0, 100, 4);
        assert_eq!(items.len(), 4);
    }
}
