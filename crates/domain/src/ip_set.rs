use ipnetwork::Ipv4Network;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Canonical set of IPv4 CIDR blocks.
///
/// Invariants: no block overlaps another, and no two buddy blocks share a
/// parent (buddies are merged on insert). `len()` is therefore the minimal
/// CIDR count for the covered address space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv4CidrSet {
    /// network address -> prefix length
    blocks: BTreeMap<u32, u8>,
}

/// Mask `addr` down to the network address of its /`prefix` block.
fn mask(addr: u32, prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        addr & (u32::MAX << (32 - prefix))
    }
}

/// Inclusive address range of a block, in u64 to survive prefix 0.
fn block_range(net: u32, prefix: u8) -> (u64, u64) {
    let first = net as u64;
    (first, first + (1u64 << (32 - prefix)) - 1)
}

impl Ipv4CidrSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// True if `net` is fully covered by a single block of the set.
    pub fn contains(&self, net: Ipv4Network) -> bool {
        let addr = u32::from(net.network());
        for p in (0..=net.prefix()).rev() {
            if self.blocks.get(&mask(addr, p)) == Some(&p) {
                return true;
            }
        }
        false
    }

    /// True if `net` shares at least one address with the set.
    pub fn intersects(&self, net: Ipv4Network) -> bool {
        if self.contains(net) {
            return true;
        }
        let addr = u32::from(net.network());
        let (first, last) = block_range(addr, net.prefix());
        let last = last.min(u32::MAX as u64) as u32;
        self.blocks.range(first as u32..=last).next().is_some()
    }

    /// Number of existing blocks that `net` fully subsumes.
    fn covered_count(&self, net: Ipv4Network) -> usize {
        let addr = u32::from(net.network());
        let (first, last) = block_range(addr, net.prefix());
        let last = last.min(u32::MAX as u64) as u32;
        self.blocks
            .range(first as u32..=last)
            .filter(|(_, &p)| p >= net.prefix())
            .count()
    }

    /// Upper bound on `len()` after inserting `net`.
    ///
    /// Exact except when a buddy merge would shrink the set further, so the
    /// caller never under-estimates the resulting cardinality.
    pub fn projected_len(&self, net: Ipv4Network) -> usize {
        if self.contains(net) {
            self.blocks.len()
        } else {
            self.blocks.len() - self.covered_count(net) + 1
        }
    }

    /// Insert a block, keeping the set canonical: subsumed blocks are
    /// dropped and buddy pairs collapse into their parent. Returns `false`
    /// when the block was already covered.
    pub fn insert(&mut self, net: Ipv4Network) -> bool {
        let mut prefix = net.prefix();
        let mut addr = mask(u32::from(net.network()), prefix);

        if self.contains(net) {
            return false;
        }

        // Drop blocks the new one subsumes.
        let (first, last) = block_range(addr, prefix);
        let last = last.min(u32::MAX as u64) as u32;
        let subsumed: Vec<u32> = self
            .blocks
            .range(first as u32..=last)
            .filter(|(_, &p)| p >= prefix)
            .map(|(&k, _)| k)
            .collect();
        for k in subsumed {
            self.blocks.remove(&k);
        }

        // Merge with the buddy block while one exists at the same prefix.
        loop {
            if prefix > 0 {
                let buddy = addr ^ (1u32 << (32 - prefix));
                if self.blocks.get(&buddy) == Some(&prefix) {
                    self.blocks.remove(&buddy);
                    prefix -= 1;
                    addr = mask(addr, prefix);
                    continue;
                }
            }
            self.blocks.insert(addr, prefix);
            return true;
        }
    }

    /// Blocks in ascending order of network address.
    pub fn iter(&self) -> impl Iterator<Item = Ipv4Network> + '_ {
        self.blocks.iter().map(|(&net, &prefix)| {
            // prefix <= 32 is maintained by construction
            Ipv4Network::new(Ipv4Addr::from(net), prefix)
                .unwrap_or_else(|_| unreachable!("canonical block out of range"))
        })
    }
}

impl FromIterator<Ipv4Network> for Ipv4CidrSet {
    fn from_iter<I: IntoIterator<Item = Ipv4Network>>(iter: I) -> Self {
        let mut set = Ipv4CidrSet::new();
        for net in iter {
            set.insert(net);
        }
        set
    }
}
