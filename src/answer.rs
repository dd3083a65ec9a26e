//! Answer sets and their comparison.

use rustc_hash::FxHashSet;
use std::fmt;
use std::net::IpAddr;

/// The unordered, duplicate-free set of addresses returned for one query.
///
/// Addresses are compared exactly as they came off the wire: an IPv4
/// address and its IPv4-mapped IPv6 form are different members.
#[derive(Debug, Clone, Default)]
pub struct AnswerSet {
    addrs: FxHashSet<IpAddr>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, addr: IpAddr) -> bool {
        self.addrs.insert(addr)
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.addrs.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.addrs.iter()
    }

    /// Addresses in a stable order, for display.
    pub fn sorted(&self) -> Vec<IpAddr> {
        let mut addrs: Vec<_> = self.addrs.iter().copied().collect();
        addrs.sort();
        addrs
    }
}

/// Set equality: same cardinality and every member of `a` is in `b`.
pub fn equals(a: &AnswerSet, b: &AnswerSet) -> bool {
    a.len() == b.len() && a.iter().all(|addr| b.contains(addr))
}

impl PartialEq for AnswerSet {
    fn eq(&self, other: &Self) -> bool {
        equals(self, other)
    }
}

impl Eq for AnswerSet {}

impl FromIterator<IpAddr> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self {
            addrs: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for AnswerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, addr) in self.sorted().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", addr)?;
        }
        f.write_str("}")
    }
}
