//! The routing table: both interval indices behind one readers-writer lock.
//!
//! # Responsibilities
//! - Dispatch lookups to the v4 or v6 index by address family
//! - Apply single mutations or whole batches under one write lease
//!
//! # Design Decisions
//! - A single lock guards both indices; finer locking is unsafe with
//!   overlapping entries
//! - Batches are applied under one lease so readers never observe a
//!   half-replaced prefix list
//! - Poisoned leases are recovered rather than propagated

use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ipnet::IpNet;

use crate::index::{V4Entry, V4Index, V6Entry, V6Index};

/// An entry tagged with its address family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrefixEntry {
    V4(V4Entry),
    V6(V6Entry),
}

impl PrefixEntry {
    pub fn new(net: IpNet, label: impl Into<Arc<str>>) -> Self {
        match net {
            IpNet::V4(net) => PrefixEntry::V4(V4Entry::from_net(net, label)),
            IpNet::V6(net) => PrefixEntry::V6(V6Entry::from_net(net, label)),
        }
    }

    pub fn network(&self) -> IpNet {
        match self {
            PrefixEntry::V4(e) => IpNet::V4(e.network()),
            PrefixEntry::V6(e) => IpNet::V6(e.network()),
        }
    }

    pub fn label(&self) -> &Arc<str> {
        match self {
            PrefixEntry::V4(e) => e.label(),
            PrefixEntry::V6(e) => e.label(),
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            PrefixEntry::V4(_) => "v4",
            PrefixEntry::V6(_) => "v6",
        }
    }
}

impl fmt::Display for PrefixEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixEntry::V4(e) => e.fmt(f),
            PrefixEntry::V6(e) => e.fmt(f),
        }
    }
}

/// A mutation of the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOp {
    Add(PrefixEntry),
    Remove(PrefixEntry),
}

/// Per-family entry counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TableStats {
    pub v4_entries: usize,
    pub v6_entries: usize,
}

#[derive(Debug, Default)]
struct Indices {
    v4: V4Index,
    v6: V6Index,
}

impl Indices {
    fn apply(&mut self, op: TableOp) {
        match op {
            TableOp::Add(PrefixEntry::V4(e)) => {
                self.v4.insert(e);
            }
            TableOp::Add(PrefixEntry::V6(e)) => {
                self.v6.insert(e);
            }
            TableOp::Remove(PrefixEntry::V4(e)) => {
                self.v4.remove(&e);
            }
            TableOp::Remove(PrefixEntry::V6(e)) => {
                self.v6.remove(&e);
            }
        }
    }
}

/// Longest-prefix location lookup over v4 and v6 prefixes.
#[derive(Debug, Default)]
pub struct RoutingTable {
    inner: RwLock<Indices>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Indices> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Indices> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up the location label covering `address`.
    ///
    /// v4-mapped v6 addresses are looked up in the v4 index.
    pub fn locate(&self, address: IpAddr) -> Option<Arc<str>> {
        let indices = self.read();
        match address.to_canonical() {
            IpAddr::V4(a) => indices.v4.find(&a.octets()).map(|e| e.label().clone()),
            IpAddr::V6(a) => indices.v6.find(&a.octets()).map(|e| e.label().clone()),
        }
    }

    /// Apply a single mutation.
    pub fn apply(&self, op: TableOp) {
        self.write().apply(op);
    }

    /// Apply all mutations under a single write lease.
    pub fn apply_batch<I>(&self, ops: I)
    where
        I: IntoIterator<Item = TableOp>,
    {
        let mut indices = self.write();
        for op in ops {
            indices.apply(op);
        }
    }

    pub fn stats(&self) -> TableStats {
        let indices = self.read();
        TableStats {
            v4_entries: indices.v4.len(),
            v6_entries: indices.v6.len(),
        }
    }
}
