//! CIDR entries stored in the interval index.
//!
//! An entry is a network prefix in fixed-width byte form plus the
//! location label it maps to. Byte arrays compare lexicographically,
//! which for big-endian addresses equals numeric comparison, so the
//! cached `start`/`end` bounds can be compared directly.

use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use ipnet::{Ipv4Net, Ipv6Net};

/// A closed address interval `[start, end]` in fixed-width byte form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval<const W: usize> {
    pub start: [u8; W],
    pub end: [u8; W],
}

impl<const W: usize> Interval<W> {
    /// The degenerate interval covering exactly one address.
    pub fn point(address: [u8; W]) -> Self {
        Self {
            start: address,
            end: address,
        }
    }

    pub fn contains(&self, address: &[u8; W]) -> bool {
        self.start <= *address && *address <= self.end
    }
}

/// Overlap-tolerant ordering between two intervals.
///
/// `Less` when `a` lies entirely before `b`, `Greater` when entirely
/// after, `Equal` whenever the two overlap (nested or identical
/// included). Not transitive: never hand it to a sort routine.
pub fn overlap_cmp<const W: usize>(a: &Interval<W>, b: &Interval<W>) -> Ordering {
    if a.end < b.start {
        Ordering::Less
    } else if a.start > b.end {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// A network prefix tagged with its location label.
///
/// Identity is `(prefix, label)`: two entries for the same prefix with
/// different labels are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CidrEntry<const W: usize> {
    interval: Interval<W>,
    prefix_len: u8,
    label: Arc<str>,
}

/// Entry in the IPv4 index.
pub type V4Entry = CidrEntry<4>;

/// Entry in the IPv6 index.
pub type V6Entry = CidrEntry<16>;

impl<const W: usize> CidrEntry<W> {
    /// Maximum prefix length for this width.
    pub const MAX_PREFIX_LEN: u8 = (W * 8) as u8;

    /// Build an entry from a base address and prefix length.
    ///
    /// Host bits of `base` are zeroed. `prefix_len` is clamped to the
    /// family width; callers validate it beforehand.
    pub fn new(base: [u8; W], prefix_len: u8, label: impl Into<Arc<str>>) -> Self {
        let prefix_len = prefix_len.min(Self::MAX_PREFIX_LEN);
        let mut start = base;
        let mut end = base;
        for (i, (s, e)) in start.iter_mut().zip(end.iter_mut()).enumerate() {
            let mask = byte_mask(prefix_len, i);
            *s &= mask;
            *e |= !mask;
        }
        let entry = Self {
            interval: Interval { start, end },
            prefix_len,
            label: label.into(),
        };
        debug_assert!(entry.interval.start <= entry.interval.end);
        entry
    }

    pub fn interval(&self) -> &Interval<W> {
        &self.interval
    }

    pub fn start(&self) -> &[u8; W] {
        &self.interval.start
    }

    pub fn end(&self) -> &[u8; W] {
        &self.interval.end
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn label(&self) -> &Arc<str> {
        &self.label
    }

    pub fn contains(&self, address: &[u8; W]) -> bool {
        self.interval.contains(address)
    }

    /// Total order used to place entries in the tree: by start, then
    /// wider prefixes first, then label.
    pub fn key_cmp(&self, other: &Self) -> Ordering {
        self.interval
            .start
            .cmp(&other.interval.start)
            .then(self.prefix_len.cmp(&other.prefix_len))
            .then_with(|| self.label.cmp(&other.label))
    }

    /// Whether `self` is a better answer for a point query than `other`.
    /// Longer prefixes win; equal prefixes fall back to label order so
    /// the answer is stable.
    pub fn more_specific_than(&self, other: &Self) -> bool {
        match self.prefix_len.cmp(&other.prefix_len) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.label < other.label,
        }
    }
}

/// Mask byte `i` for a prefix of `prefix_len` bits.
fn byte_mask(prefix_len: u8, i: usize) -> u8 {
    let bits_before = (i * 8) as u32;
    let len = prefix_len as u32;
    if len >= bits_before + 8 {
        0xff
    } else if len <= bits_before {
        0x00
    } else {
        0xffu8 << (8 - (len - bits_before))
    }
}

impl V4Entry {
    pub fn from_net(net: Ipv4Net, label: impl Into<Arc<str>>) -> Self {
        Self::new(net.addr().octets(), net.prefix_len(), label)
    }

    pub fn network(&self) -> Ipv4Net {
        // prefix_len is clamped to 32 at construction
        Ipv4Net::new_assert(Ipv4Addr::from(self.interval.start), self.prefix_len)
    }
}

impl V6Entry {
    pub fn from_net(net: Ipv6Net, label: impl Into<Arc<str>>) -> Self {
        Self::new(net.addr().octets(), net.prefix_len(), label)
    }

    pub fn network(&self) -> Ipv6Net {
        Ipv6Net::new_assert(Ipv6Addr::from(self.interval.start), self.prefix_len)
    }
}

impl fmt::Display for V4Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.network(), self.label)
    }
}

impl fmt::Display for V6Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.network(), self.label)
    }
}
