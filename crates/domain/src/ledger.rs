use crate::decision::{BanEntry, BanList, Decision};
use std::collections::{HashMap, HashSet};

/// Order-preserving map of the current ban set, keyed by decision value.
///
/// A re-inserted value keeps its original position; only its payload is
/// replaced. Not durable: a restart rebuilds it from the feed.
#[derive(Debug, Default)]
pub struct DecisionLedger {
    order: Vec<String>,
    entries: HashMap<String, Decision>,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove decisions by value. Unknown values are no-ops.
    /// Returns the number of entries actually removed.
    pub fn apply_deletions(&mut self, batch: &[Decision]) -> usize {
        let mut dropped: HashSet<&str> = HashSet::new();
        for decision in batch {
            if self.entries.remove(&decision.value).is_some() {
                dropped.insert(decision.value.as_str());
            }
        }
        if dropped.is_empty() {
            return 0;
        }
        let removed = dropped.len();
        self.order.retain(|value| !dropped.contains(value.as_str()));
        removed
    }

    /// Upsert decisions. A known value keeps its position in the order;
    /// a new value is appended. Returns the number of new entries.
    pub fn apply_additions(&mut self, batch: Vec<Decision>) -> usize {
        let mut inserted = 0;
        for decision in batch {
            if !self.entries.contains_key(&decision.value) {
                self.order.push(decision.value.clone());
                inserted += 1;
            }
            self.entries.insert(decision.value.clone(), decision);
        }
        inserted
    }

    /// Current ban set in reverse insertion order (newest first), so a
    /// capacity-truncated downstream blocklist prefers the latest bans.
    pub fn snapshot(&self) -> BanList {
        self.order
            .iter()
            .rev()
            .filter_map(|value| {
                self.entries.get(value).map(|d| BanEntry {
                    value: d.value.clone(),
                    action: d.action,
                })
            })
            .collect()
    }
}
