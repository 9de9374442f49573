use crate::ip_set::Ipv4CidrSet;
use ipnetwork::Ipv4Network;
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;

/// Multicast plus class-E space; never stored in a blocklist.
const RESERVED: &str = "224.0.0.0/3";

/// Why a raw input never reached the blocklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    NotIpv4,
    Ignored,
    Full,
}

impl DiscardReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::NotIpv4 => "not-ipv4",
            DiscardReason::Ignored => "ignored",
            DiscardReason::Full => "full",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inputs that were dropped, with the reason, in offer order.
pub type DiscardLog = Vec<(String, DiscardReason)>;

/// Canonical bounded blocklist, rendered: `a.b.c.d` for a /32, otherwise
/// `a.b.c.d/n`, ascending by network address.
pub type IpBlocklist = Vec<String>;

/// Compresses a stream of raw IP/CIDR strings into a bounded canonical
/// IPv4 blocklist. A per-tick transient: build, `finalize`, drop.
///
/// Hosts from a /24 whose sibling was already offered are widened to the
/// whole /24, so the bounded entry count covers far more addresses.
/// Over-capacity inputs are discarded rather than evicted, keeping the
/// projection stable from tick to tick.
pub struct IpListBuilder {
    max_size: usize,
    set: Ipv4CidrSet,
    ignore: Ipv4CidrSet,
    discards: DiscardLog,
    seen_net24: HashSet<u32>,
}

impl IpListBuilder {
    pub fn new(max_size: usize) -> Self {
        let mut ignore = Ipv4CidrSet::new();
        if let Ok(net) = RESERVED.parse::<Ipv4Network>() {
            ignore.insert(net);
        }
        Self {
            max_size,
            set: Ipv4CidrSet::new(),
            ignore,
            discards: Vec::new(),
            seen_net24: HashSet::new(),
        }
    }

    /// Add a network whose addresses must never be emitted. Inputs that do
    /// not parse as IPv4 are skipped; they cannot match an IPv4 entry.
    pub fn add_ignore(&mut self, raw: &str) {
        if let Ok(net) = raw.trim().parse::<Ipv4Network>() {
            self.ignore.insert(net);
        }
    }

    pub fn add_ignore_many<I, S>(&mut self, list: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in list {
            self.add_ignore(raw.as_ref());
        }
    }

    /// Classify and insert one raw input.
    pub fn add(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.contains('/') {
            match trimmed.parse::<Ipv4Network>() {
                Ok(net) => self.offer_network(net, raw),
                Err(_) => self.discard(raw, DiscardReason::NotIpv4),
            }
        } else {
            match trimmed.parse::<Ipv4Addr>() {
                Ok(addr) => self.offer_host(addr, raw),
                Err(_) => self.discard(raw, DiscardReason::NotIpv4),
            }
        }
    }

    pub fn add_many<I, S>(&mut self, list: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in list {
            self.add(raw.as_ref());
        }
    }

    /// Compact and render the working set.
    pub fn finalize(self) -> (IpBlocklist, DiscardLog) {
        let blocklist = self
            .set
            .iter()
            .map(|net| {
                if net.prefix() == 32 {
                    net.network().to_string()
                } else {
                    net.to_string()
                }
            })
            .collect();
        (blocklist, self.discards)
    }

    fn offer_network(&mut self, net: Ipv4Network, raw: &str) {
        if self.ignore.intersects(net) {
            self.discard(raw, DiscardReason::Ignored);
            return;
        }
        self.try_insert(net, raw, false);
    }

    fn offer_host(&mut self, addr: Ipv4Addr, raw: &str) {
        let host = match Ipv4Network::new(addr, 32) {
            Ok(net) => net,
            Err(_) => {
                self.discard(raw, DiscardReason::NotIpv4);
                return;
            }
        };
        if self.ignore.intersects(host) {
            self.discard(raw, DiscardReason::Ignored);
            return;
        }
        let net24_addr = u32::from(addr) & 0xffff_ff00;
        if self.seen_net24.contains(&net24_addr) {
            // A sibling from this /24 was offered before: widen to the /24,
            // unless the aggregate would spill into ignored space.
            match Ipv4Network::new(Ipv4Addr::from(net24_addr), 24) {
                Ok(agg) if !self.ignore.intersects(agg) => {
                    self.try_insert(agg, raw, true);
                }
                _ => self.try_insert(host, raw, false),
            }
        } else {
            self.seen_net24.insert(net24_addr);
            self.try_insert(host, raw, false);
        }
    }

    /// Capacity-gated insert. `aggregate` inserts never count against the
    /// bound: they only ever keep or reduce the CIDR count.
    fn try_insert(&mut self, net: Ipv4Network, raw: &str, aggregate: bool) {
        if aggregate {
            self.set.insert(net);
            return;
        }
        if self.set.contains(net) {
            return;
        }
        if self.set.projected_len(net) > self.max_size {
            self.discard(raw, DiscardReason::Full);
        } else {
            self.set.insert(net);
        }
    }

    fn discard(&mut self, raw: &str, reason: DiscardReason) {
        self.discards.push((raw.to_string(), reason));
    }
}
