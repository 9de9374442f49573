use std::collections::{HashMap, HashSet};

/// Outcome counters for one partitioner update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStats {
    pub added: usize,
    pub removed: usize,
    pub bin_count: usize,
    pub total_ips: usize,
}

/// Distributes a flat IP list across fixed-capacity bins.
///
/// An entry present both before and after an `update` never changes bin,
/// which keeps the remote rules built from these bins stable across ticks.
pub struct IpGroupPartitioner {
    max_per_bin: usize,
    bins: Vec<HashSet<String>>,
    index: HashMap<String, usize>,
}

impl IpGroupPartitioner {
    pub fn new(max_per_bin: usize) -> Self {
        Self {
            max_per_bin,
            bins: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Seed state with the grouping observed on the remote surface.
    pub fn load(&mut self, existing: Vec<Vec<String>>) {
        self.bins.clear();
        self.index.clear();
        for group in existing {
            let idx = self.bins.len();
            let mut bin = HashSet::with_capacity(group.len());
            for ip in group {
                self.index.insert(ip.clone(), idx);
                bin.insert(ip);
            }
            self.bins.push(bin);
        }
    }

    /// Reconcile the bins against `desired`: removals first, then
    /// additions into the emptiest bin with room.
    pub fn update(&mut self, desired: &[String]) -> GroupStats {
        let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();

        let mut to_remove: Vec<String> = self
            .index
            .keys()
            .filter(|ip| !desired_set.contains(ip.as_str()))
            .cloned()
            .collect();
        to_remove.sort();
        let removed = to_remove.len();
        for ip in to_remove {
            self.remove_entry(&ip);
        }

        let mut added = 0;
        for ip in desired {
            if !self.index.contains_key(ip) {
                self.add_entry(ip.clone());
                added += 1;
            }
        }

        GroupStats {
            added,
            removed,
            bin_count: self.bins.len(),
            total_ips: self.index.len(),
        }
    }

    /// Bins in index order, each rendered as a sorted list.
    pub fn bins(&self) -> Vec<Vec<String>> {
        self.bins
            .iter()
            .map(|bin| {
                let mut entries: Vec<String> = bin.iter().cloned().collect();
                entries.sort();
                entries
            })
            .collect()
    }

    pub fn total(&self) -> usize {
        self.index.len()
    }

    fn remove_entry(&mut self, ip: &str) {
        let Some(idx) = self.index.remove(ip) else {
            return;
        };
        self.bins[idx].remove(ip);
        if self.bins[idx].is_empty() {
            // The last bin takes the freed slot; reindex only its entries.
            self.bins.swap_remove(idx);
            if idx < self.bins.len() {
                for moved in &self.bins[idx] {
                    self.index.insert(moved.clone(), idx);
                }
            }
        }
    }

    fn add_entry(&mut self, ip: String) {
        let target = self
            .bins
            .iter()
            .enumerate()
            .filter(|(_, bin)| bin.len() < self.max_per_bin)
            .min_by_key(|(idx, bin)| (bin.len(), *idx))
            .map(|(idx, _)| idx);
        let idx = match target {
            Some(idx) => idx,
            None => {
                self.bins.push(HashSet::new());
                self.bins.len() - 1
            }
        };
        self.index.insert(ip.clone(), idx);
        self.bins[idx].insert(ip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ips(range: std::ops::Range<u32>) -> Vec<String> {
        range.map(|i| format!("10.{}.{}.{}", i >> 16, (i >> 8) & 0xff, i & 0xff)).collect()
    }

    #[test]
    fn additions_prefer_emptiest_bin() {
        let mut part = IpGroupPartitioner::new(3);
        part.load(vec![
            vec!["a".into(), "b".into()],
            vec!["c".into()],
        ]);
        part.update(&["a".into(), "b".into(), "c".into(), "d".into()]);
        let bins = part.bins();
        assert_eq!(bins[0], vec!["a", "b"]);
        assert_eq!(bins[1], vec!["c", "d"]);
    }

    #[test]
    fn empty_bin_is_swap_removed() {
        let mut part = IpGroupPartitioner::new(5);
        part.load(vec![
            vec!["a".into()],
            vec!["b".into()],
            vec!["c".into()],
        ]);
        part.update(&["b".into(), "c".into()]);
        let bins = part.bins();
        assert_eq!(bins.len(), 2);
        // the last bin moved into slot 0, untouched entries stayed put
        assert_eq!(bins[0], vec!["c"]);
        assert_eq!(bins[1], vec!["b"]);
    }

    #[test]
    fn large_update_fills_and_spills() {
        let mut part = IpGroupPartitioner::new(100);
        part.load(vec![ips(0..80)]);
        let stats = part.update(&ips(0..150));
        assert_eq!(stats.added, 70);
        assert_eq!(stats.removed, 0);
        assert_eq!(stats.bin_count, 2);
        assert_eq!(stats.total_ips, 150);
        let bins = part.bins();
        assert_eq!(bins[0].len(), 100);
        assert_eq!(bins[1].len(), 50);
    }
}
