//! Translates prefix list events into routing table mutations.
//!
//! # Responsibilities
//! - Parse each list into entries, skipping malformed pairs
//! - Apply add/update/delete as one batch per event
//! - Remember what each list contributed so redelivery and deletes
//!   stay exact
//! - Flip readiness on the synced signal
//!
//! # Design Decisions
//! - Entries shared by several lists are reference counted; an entry
//!   leaves the table only when no current list holds it
//! - The adapter lock is held while the batch is applied, so handlers
//!   for different lists serialize on the table's write lease

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc};

use super::parse::list_entries;
use super::types::{ListKey, PrefixList, PrefixListEvent};
use crate::health::Readiness;
use crate::observability::metrics;
use crate::routing::{PrefixEntry, RoutingTable, TableOp};

/// Sender half handed to an external watcher.
pub type EventSender = mpsc::UnboundedSender<PrefixListEvent>;

/// Receiver half consumed by [`PrefixListAdapter::run`].
pub type EventReceiver = mpsc::UnboundedReceiver<PrefixListEvent>;

#[derive(Debug, Default)]
struct AdapterState {
    /// Entries applied on behalf of each list object.
    lists: HashMap<ListKey, Vec<PrefixEntry>>,
    /// Number of current lists holding each entry.
    refs: HashMap<PrefixEntry, usize>,
}

impl AdapterState {
    /// Replace the entries held for `key`, returning the table ops
    /// that take the table from the old union to the new one.
    fn replace(&mut self, key: &ListKey, entries: Option<Vec<PrefixEntry>>) -> Vec<TableOp> {
        let mut removed = HashSet::new();
        let mut added = Vec::new();

        if let Some(old) = self.lists.remove(key) {
            for entry in old {
                match self.refs.get_mut(&entry) {
                    Some(count) if *count > 1 => *count -= 1,
                    Some(_) => {
                        self.refs.remove(&entry);
                        removed.insert(entry);
                    }
                    None => {}
                }
            }
        }

        if let Some(mut new) = entries {
            new.sort_by_key(|e| e.network());
            new.dedup();
            for entry in &new {
                let count = self.refs.entry(entry.clone()).or_insert(0);
                *count += 1;
                // Removed and re-added in the same event: no table change.
                if *count == 1 && !removed.remove(entry) {
                    added.push(TableOp::Add(entry.clone()));
                }
            }
            self.lists.insert(key.clone(), new);
        }

        removed
            .into_iter()
            .map(TableOp::Remove)
            .chain(added)
            .collect()
    }
}

/// Consumes watcher events and keeps the routing table in step.
#[derive(Debug)]
pub struct PrefixListAdapter {
    table: Arc<RoutingTable>,
    readiness: Readiness,
    namespace: Option<String>,
    state: Mutex<AdapterState>,
}

impl PrefixListAdapter {
    pub fn new(table: Arc<RoutingTable>, readiness: Readiness) -> Self {
        Self {
            table,
            readiness,
            namespace: None,
            state: Mutex::new(AdapterState::default()),
        }
    }

    /// Ignore list objects outside `namespace`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    /// Number of lists currently applied.
    pub fn list_count(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).lists.len()
    }

    fn in_scope(&self, list: &PrefixList) -> bool {
        match (&self.namespace, &list.namespace) {
            (Some(want), Some(have)) => want == have,
            _ => true,
        }
    }

    /// Apply one event.
    pub fn handle(&self, event: PrefixListEvent) {
        metrics::record_event(event.kind());

        match event {
            PrefixListEvent::Added(list) => {
                if self.in_scope(&list) {
                    self.apply(&[(list.key(), Some(&list))]);
                }
            }
            PrefixListEvent::Updated { old, new } => {
                match (self.in_scope(&old), self.in_scope(&new)) {
                    (_, true) if old.key() != new.key() => {
                        self.apply(&[(old.key(), None), (new.key(), Some(&new))])
                    }
                    (_, true) => self.apply(&[(new.key(), Some(&new))]),
                    (true, false) => self.apply(&[(old.key(), None)]),
                    (false, false) => {}
                }
            }
            PrefixListEvent::Deleted(list) => {
                if self.in_scope(&list) {
                    self.apply(&[(list.key(), None)]);
                }
            }
            PrefixListEvent::Synced => self.readiness.mark_synced(),
        }
    }

    /// Replace the contribution of each list object (`None` drops it),
    /// all in one table batch.
    fn apply(&self, changes: &[(ListKey, Option<&PrefixList>)]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ops = Vec::new();
        for (key, list) in changes {
            ops.extend(state.replace(key, list.map(list_entries)));
        }

        let name = changes.last().map(|(key, _)| key.to_string()).unwrap_or_default();
        if ops.is_empty() {
            tracing::debug!(list = %name, "Prefix list event changed nothing");
            return;
        }

        for op in &ops {
            match op {
                TableOp::Add(entry) => tracing::debug!(list = %name, prefix = %entry, "Adding prefix"),
                TableOp::Remove(entry) => tracing::debug!(list = %name, prefix = %entry, "Removing prefix"),
            }
        }

        let count = ops.len();
        self.table.apply_batch(ops);
        drop(state);

        let stats = self.table.stats();
        metrics::record_table_size(stats.v4_entries, stats.v6_entries);
        tracing::info!(
            list = %name,
            changes = count,
            v4_entries = stats.v4_entries,
            v6_entries = stats.v6_entries,
            "Applied prefix list"
        );
    }

    /// Consume events until the channel closes or shutdown fires.
    pub async fn run(self: Arc<Self>, mut events: EventReceiver, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Prefix list adapter starting");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        tracing::info!("Prefix list event stream closed");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Prefix list adapter received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> (Arc<RoutingTable>, PrefixListAdapter) {
        let table = Arc::new(RoutingTable::new());
        let adapter = PrefixListAdapter::new(table.clone(), Readiness::new());
        (table, adapter)
    }

    fn locate(table: &RoutingTable, addr: &str) -> Option<String> {
        table.locate(addr.parse().unwrap()).map(|l| l.to_string())
    }

    fn eu_west() -> PrefixList {
        PrefixList::new("eu", "eu-west")
            .with_v4("10.0.0.0", 8)
            .with_v6("2001:db8::", 32)
    }

    #[test]
    fn test_add_then_delete_round_trip() {
        let (table, adapter) = adapter();
        adapter.handle(PrefixListEvent::Added(eu_west()));

        assert_eq!(locate(&table, "10.1.2.3").as_deref(), Some("eu-west"));
        assert_eq!(locate(&table, "2001:db8::1").as_deref(), Some("eu-west"));

        adapter.handle(PrefixListEvent::Deleted(eu_west()));
        assert_eq!(locate(&table, "10.1.2.3"), None);
        assert_eq!(table.stats().v4_entries, 0);
        assert_eq!(table.stats().v6_entries, 0);
        assert_eq!(adapter.list_count(), 0);
    }

    #[test]
    fn test_add_is_idempotent() {
        let (table, adapter) = adapter();
        adapter.handle(PrefixListEvent::Added(eu_west()));
        let once = table.stats();
        adapter.handle(PrefixListEvent::Added(eu_west()));
        assert_eq!(table.stats(), once);

        // A single delete still clears it after redelivery.
        adapter.handle(PrefixListEvent::Deleted(eu_west()));
        assert_eq!(locate(&table, "10.1.2.3"), None);
    }

    #[test]
    fn test_update_relabels() {
        let (table, adapter) = adapter();
        let old = PrefixList::new("l", "a").with_v4("1.2.3.0", 24);
        let new = PrefixList::new("l", "b").with_v4("1.2.3.0", 24);

        adapter.handle(PrefixListEvent::Added(old.clone()));
        assert_eq!(locate(&table, "1.2.3.4").as_deref(), Some("a"));

        adapter.handle(PrefixListEvent::Updated { old, new });
        assert_eq!(locate(&table, "1.2.3.4").as_deref(), Some("b"));
        assert_eq!(table.stats().v4_entries, 1);
    }

    #[test]
    fn test_update_changes_prefixes() {
        let (table, adapter) = adapter();
        let old = PrefixList::new("l", "a").with_v4("1.2.3.0", 24).with_v4("5.6.7.0", 24);
        let new = PrefixList::new("l", "a").with_v4("1.2.3.0", 24).with_v4("8.8.8.0", 24);

        adapter.handle(PrefixListEvent::Added(old.clone()));
        adapter.handle(PrefixListEvent::Updated { old, new });

        assert_eq!(locate(&table, "1.2.3.4").as_deref(), Some("a"));
        assert_eq!(locate(&table, "5.6.7.8"), None);
        assert_eq!(locate(&table, "8.8.8.8").as_deref(), Some("a"));
    }

    #[test]
    fn test_shared_entry_survives_other_list_delete() {
        let (table, adapter) = adapter();
        let first = PrefixList::new("first", "eu-west").with_v4("10.0.0.0", 8);
        let second = PrefixList::new("second", "eu-west")
            .with_v4("10.0.0.0", 8)
            .with_v4("172.16.0.0", 12);

        adapter.handle(PrefixListEvent::Added(first.clone()));
        adapter.handle(PrefixListEvent::Added(second));
        adapter.handle(PrefixListEvent::Deleted(first));

        assert_eq!(locate(&table, "10.0.0.1").as_deref(), Some("eu-west"));
        assert_eq!(locate(&table, "172.16.0.1").as_deref(), Some("eu-west"));
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let (table, adapter) = adapter();
        let list = PrefixList::new("mixed", "us-east")
            .with_v4("192.0.2.0", 24)
            .with_v4("300.0.0.1", 24)
            .with_v4("198.51.100.0", 99);

        adapter.handle(PrefixListEvent::Added(list));
        assert_eq!(locate(&table, "192.0.2.7").as_deref(), Some("us-east"));
        assert_eq!(table.stats().v4_entries, 1);
    }

    #[test]
    fn test_delete_unknown_list_is_noop() {
        let (table, adapter) = adapter();
        adapter.handle(PrefixListEvent::Added(eu_west()));
        adapter.handle(PrefixListEvent::Deleted(PrefixList::new("other", "x").with_v4("10.0.0.0", 8)));
        assert_eq!(locate(&table, "10.0.0.1").as_deref(), Some("eu-west"));
    }

    #[test]
    fn test_synced_sets_readiness() {
        let (_, adapter) = adapter();
        assert!(!adapter.is_ready());
        adapter.handle(PrefixListEvent::Synced);
        assert!(adapter.is_ready());
    }

    #[test]
    fn test_namespace_filter() {
        let table = Arc::new(RoutingTable::new());
        let adapter = PrefixListAdapter::new(table.clone(), Readiness::new()).with_namespace("edge");

        let ours = PrefixList::new("ours", "eu").with_v4("10.0.0.0", 8).in_namespace("edge");
        let theirs = PrefixList::new("theirs", "us").with_v4("11.0.0.0", 8).in_namespace("other");
        adapter.handle(PrefixListEvent::Added(ours.clone()));
        adapter.handle(PrefixListEvent::Added(theirs));

        assert_eq!(locate(&table, "10.0.0.1").as_deref(), Some("eu"));
        assert_eq!(locate(&table, "11.0.0.1"), None);

        // Moving out of the namespace removes the list.
        let moved = ours.clone().in_namespace("other");
        adapter.handle(PrefixListEvent::Updated { old: ours, new: moved });
        assert_eq!(locate(&table, "10.0.0.1"), None);
    }

    #[test]
    fn test_delete_of_unknown_list_changes_nothing() {
        let (table, adapter) = adapter();
        adapter.handle(PrefixListEvent::Added(eu_west()));

        let stranger = PrefixList::new("stranger", "eu-west").with_v4("10.0.0.0", 8);
        adapter.handle(PrefixListEvent::Deleted(stranger));

        assert_eq!(locate(&table, "10.0.0.1").as_deref(), Some("eu-west"));
        assert_eq!(adapter.list_count(), 1);
    }

    #[test]
    fn test_same_name_in_two_namespaces() {
        let (table, adapter) = adapter();
        let prod = PrefixList::new("eu", "eu-west").with_v4("10.0.0.0", 8).in_namespace("prod");
        let staging = PrefixList::new("eu", "us-east").with_v4("192.0.2.0", 24).in_namespace("staging");

        adapter.handle(PrefixListEvent::Added(prod.clone()));
        adapter.handle(PrefixListEvent::Added(staging.clone()));
        assert_eq!(adapter.list_count(), 2);
        assert_eq!(locate(&table, "10.0.0.1").as_deref(), Some("eu-west"));
        assert_eq!(locate(&table, "192.0.2.1").as_deref(), Some("us-east"));

        adapter.handle(PrefixListEvent::Deleted(staging));
        assert_eq!(locate(&table, "10.0.0.1").as_deref(), Some("eu-west"));
        assert_eq!(locate(&table, "192.0.2.1"), None);

        adapter.handle(PrefixListEvent::Deleted(prod));
        assert_eq!(table.stats().v4_entries, 0);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (table, adapter) = adapter();
        let adapter = Arc::new(adapter);
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(adapter.clone().run(rx, shutdown_rx));
        tx.send(PrefixListEvent::Added(eu_west())).unwrap();
        tx.send(PrefixListEvent::Synced).unwrap();

        for _ in 0..100 {
            if adapter.is_ready() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(adapter.is_ready());
        assert_eq!(locate(&table, "10.0.0.1").as_deref(), Some("eu-west"));

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
