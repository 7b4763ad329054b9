//! PrefixList entity and watcher events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One `(address, mask length)` pair as written in a prefix list.
///
/// Kept unparsed so that a single malformed pair can be skipped without
/// rejecting the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AddressPrefix {
    pub address: String,
    pub size: i64,
}

impl AddressPrefix {
    pub fn new(address: impl Into<String>, size: i64) -> Self {
        Self {
            address: address.into(),
            size,
        }
    }
}

/// v4 and v6 prefixes of a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PrefixSet {
    #[serde(default)]
    pub v4: Vec<AddressPrefix>,
    #[serde(default)]
    pub v6: Vec<AddressPrefix>,
}

/// A declarative binding of a destination label to a set of prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixList {
    /// Unique identifier of the list object.
    pub name: String,
    /// Namespace the object lives in, if the source has namespaces.
    pub namespace: Option<String>,
    /// Label carried by every prefix of this list.
    pub destination: String,
    pub prefix: PrefixSet,
}

impl PrefixList {
    pub fn new(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            destination: destination.into(),
            prefix: PrefixSet::default(),
        }
    }

    pub fn with_v4(mut self, address: &str, size: i64) -> Self {
        self.prefix.v4.push(AddressPrefix::new(address, size));
        self
    }

    pub fn with_v6(mut self, address: &str, size: i64) -> Self {
        self.prefix.v6.push(AddressPrefix::new(address, size));
        self
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Identity of the list object: namespace plus name.
    pub fn key(&self) -> ListKey {
        ListKey {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

/// Identity of a list object. Names are only unique within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Events delivered by a prefix list watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixListEvent {
    Added(PrefixList),
    Updated { old: PrefixList, new: PrefixList },
    Deleted(PrefixList),
    /// The initial burst of `Added` events is complete.
    Synced,
}

impl PrefixListEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PrefixListEvent::Added(_) => "add",
            PrefixListEvent::Updated { .. } => "update",
            PrefixListEvent::Deleted(_) => "delete",
            PrefixListEvent::Synced => "synced",
        }
    }
}
