//! Want-selection: which inventory items to request in a `sync-get` frame.

use std::collections::HashSet;

use dmesh_proto::InvItem;

/// Select which advertised `msg_id`s to request, given a byte budget:
///
/// - filter out anything already in the local seen-set,
/// - sort by priority descending, then soonest-expiring first,
/// - accumulate greedily, skipping any item that would overflow `budget`
///   rather than stopping at the first one that doesn't fit, so a single
///   oversized high-priority item never starves everything behind it.
#[must_use]
pub fn select_want(items: &[InvItem], already_seen: &HashSet<String>, budget_bytes: u32) -> Vec<String> {
    let mut candidates: Vec<&InvItem> = items.iter().filter(|i| !already_seen.contains(&i.msg_id)).collect();
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.exp.cmp(&b.exp)));

    let mut want = Vec::new();
    let mut used: u64 = 0;
    let budget = u64::from(budget_bytes);
    for item in candidates {
        let size = u64::from(item.size);
        if used + size > budget {
            continue;
        }
        used += size;
        want.push(item.msg_id.clone());
    }
    want
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(msg_id: &str, exp: u64, size: u32, priority: u8) -> InvItem {
        InvItem { msg_id: msg_id.to_string(), exp, size, priority }
    }

    #[test]
    fn filters_out_already_seen_items() {
        let items = vec![item("a", 100, 10, 1), item("b", 100, 10, 1)];
        let mut seen = HashSet::new();
        seen.insert("a".to_string());
        let want = select_want(&items, &seen, 1000);
        assert_eq!(want, vec!["b".to_string()]);
    }

    #[test]
    fn prioritizes_higher_priority_then_soonest_expiry() {
        let items = vec![item("low", 100, 10, 1), item("high-later", 200, 10, 5), item("high-sooner", 50, 10, 5)];
        let want = select_want(&items, &HashSet::new(), 1000);
        assert_eq!(want, vec!["high-sooner".to_string(), "high-later".to_string(), "low".to_string()]);
    }

    #[test]
    fn stays_within_byte_budget_skipping_items_that_do_not_fit() {
        let items = vec![item("big", 100, 900, 5), item("small-a", 100, 60, 4), item("small-b", 100, 60, 3)];
        let want = select_want(&items, &HashSet::new(), 150);
        assert_eq!(want, vec!["small-a".to_string(), "small-b".to_string()]);
    }

    #[test]
    fn empty_inventory_yields_empty_want() {
        assert!(select_want(&[], &HashSet::new(), 1000).is_empty());
    }
}
