//! Prefix lists from a directory of YAML files.
//!
//! # Responsibilities
//! - Initial sync: one `Added` per parseable file, then `Synced`
//! - Watch the directory and reconcile each changed file into
//!   `Added` / `Updated` / `Deleted` events
//!
//! # Design Decisions
//! - One file is one prefix list; the file stem names `routing:` documents
//! - A file that fails to parse keeps its previous state
//! - A list identity (namespace, name) belongs to one file; a second file
//!   claiming it is ignored until the identity frees up
//! - The watcher is installed before the directory is read, so no
//!   change between the two is lost
//! - The notify callback only forwards paths; reconciliation runs on a
//!   tokio task that owns the per-file state

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use super::adapter::EventSender;
use super::document::parse_document;
use super::types::{PrefixList, PrefixListEvent};
use crate::error::SetupError;

/// Whether `path` looks like a prefix list document.
fn is_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn load_file(path: &Path) -> Option<PrefixList> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to read prefix list file");
            return None;
        }
    };
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match parse_document(&text, stem) {
        Ok(list) => Some(list),
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to parse prefix list file");
            None
        }
    }
}

/// Watches a directory of prefix list files and emits events.
pub struct DirectorySource {
    dir: PathBuf,
    events: EventSender,
    lists: HashMap<PathBuf, PrefixList>,
    /// Files whose list identity is already held by another file.
    shadowed: BTreeSet<PathBuf>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, events: EventSender) -> Self {
        Self {
            dir: dir.into(),
            events,
            lists: HashMap::new(),
            shadowed: BTreeSet::new(),
        }
    }

    fn emit(&self, event: PrefixListEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!(dir = ?self.dir, "Prefix list adapter is gone, dropping event");
        }
    }

    /// Another file already holding the identity of `list`.
    fn holder(&self, path: &Path, list: &PrefixList) -> Option<&Path> {
        let key = list.key();
        self.lists
            .iter()
            .find(|(other, held)| other.as_path() != path && held.key() == key)
            .map(|(other, _)| other.as_path())
    }

    /// Load every document in the directory, then signal synced.
    ///
    /// Failing to list the directory is fatal; individual files that
    /// fail to parse are logged and skipped.
    pub fn initial_sync(&mut self) -> Result<(), SetupError> {
        let read_dir = fs::read_dir(&self.dir).map_err(|source| SetupError::InitialList {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_document(p))
            .collect();
        paths.sort();

        for path in paths {
            if let Some(list) = load_file(&path) {
                if let Some(holder) = self.holder(&path, &list) {
                    tracing::error!(path = ?path, holder = ?holder, list = %list.key(), "Duplicate prefix list, ignoring file");
                    self.shadowed.insert(path);
                    continue;
                }
                tracing::info!(path = ?path, list = %list.key(), "Loaded prefix list");
                self.emit(PrefixListEvent::Added(list.clone()));
                self.lists.insert(path, list);
            }
        }

        tracing::info!(dir = ?self.dir, lists = self.lists.len(), "Initial prefix list sync complete");
        self.emit(PrefixListEvent::Synced);
        Ok(())
    }

    /// Start the watcher, then run the initial sync.
    ///
    /// Changes that land while the directory is being read are queued on
    /// the returned receiver and reconciled by [`DirectorySource::run`].
    pub fn sync_and_watch(
        &mut self,
        poll_interval: Duration,
    ) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>), SetupError> {
        let watching = self.watch(poll_interval)?;
        self.initial_sync()?;
        Ok(watching)
    }

    /// Bring the state for `path` in line with the file on disk.
    pub fn reconcile(&mut self, path: &Path) {
        if !is_document(path) {
            return;
        }

        if !path.exists() {
            self.shadowed.remove(path);
            if let Some(old) = self.lists.remove(path) {
                tracing::info!(path = ?path, list = %old.key(), "Prefix list file removed");
                self.emit(PrefixListEvent::Deleted(old));
                self.retry_shadowed();
            }
            return;
        }

        let new = match load_file(path) {
            Some(list) => list,
            None => return,
        };

        if let Some(holder) = self.holder(path, &new) {
            tracing::error!(path = ?path, holder = ?holder, list = %new.key(), "Duplicate prefix list, ignoring file");
            self.shadowed.insert(path.to_path_buf());
            if let Some(old) = self.lists.remove(path) {
                self.emit(PrefixListEvent::Deleted(old));
                self.retry_shadowed();
            }
            return;
        }
        self.shadowed.remove(path);

        match self.lists.insert(path.to_path_buf(), new.clone()) {
            Some(old) if old == new => {}
            Some(old) => {
                tracing::info!(path = ?path, list = %new.key(), "Prefix list file changed");
                let renamed = old.key() != new.key();
                self.emit(PrefixListEvent::Updated { old, new });
                if renamed {
                    self.retry_shadowed();
                }
            }
            None => {
                tracing::info!(path = ?path, list = %new.key(), "Prefix list file added");
                self.emit(PrefixListEvent::Added(new));
            }
        }
    }

    /// Reconcile files that were shadowed; an identity may have freed up.
    fn retry_shadowed(&mut self) {
        let pending = std::mem::take(&mut self.shadowed);
        for path in pending {
            self.reconcile(&path);
        }
    }

    /// Start the filesystem watcher. Changed paths are delivered on the
    /// returned receiver; the watcher stops when dropped.
    pub fn watch(
        &self,
        poll_interval: Duration,
    ) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>), SetupError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove() {
                        for path in event.paths {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(poll_interval),
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        tracing::info!(dir = ?self.dir, "Prefix list directory watcher started");
        Ok((watcher, rx))
    }

    /// Reconcile changed paths until shutdown or the watcher goes away.
    pub async fn run(
        mut self,
        mut changes: mpsc::UnboundedReceiver<PathBuf>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                path = changes.recv() => match path {
                    Some(path) => self.reconcile(&path),
                    None => break,
                },
                _ = shutdown.recv() => {
                    tracing::info!(dir = ?self.dir, "Directory source received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn drain(rx: &mut mpsc::UnboundedReceiver<PrefixListEvent>) -> Vec<PrefixListEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    const EU: &str = "routing:\n  location: eu-west\n  prefix:\n    v4:\n      - address: 10.0.0.0\n        size: 8\n";
    const US: &str = "routing:\n  location: us-east\n  prefix:\n    v4:\n      - address: 10.0.0.0\n        size: 8\n";

    #[test]
    fn test_initial_sync_and_reconcile() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("eu.yaml"), EU).unwrap();
        fs::write(dir.join("broken.yaml"), "routing: [").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut source = DirectorySource::new(dir, tx);
        source.initial_sync().unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        match &events[0] {
            PrefixListEvent::Added(list) => {
                assert_eq!(list.name, "eu");
                assert_eq!(list.destination, "eu-west");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(events[1], PrefixListEvent::Synced);

        // Unchanged content produces nothing.
        source.reconcile(&dir.join("eu.yaml"));
        assert!(drain(&mut rx).is_empty());

        fs::write(dir.join("eu.yaml"), US).unwrap();
        source.reconcile(&dir.join("eu.yaml"));
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [PrefixListEvent::Updated { old, new }] if old.destination == "eu-west" && new.destination == "us-east"
        ));

        // A broken rewrite keeps the previous state.
        fs::write(dir.join("eu.yaml"), "routing: [").unwrap();
        source.reconcile(&dir.join("eu.yaml"));
        assert!(drain(&mut rx).is_empty());

        fs::remove_file(dir.join("eu.yaml")).unwrap();
        source.reconcile(&dir.join("eu.yaml"));
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [PrefixListEvent::Deleted(old)] if old.destination == "us-east"
        ));
    }

    fn resource(name: &str, namespace: &str, location: &str, address: &str, size: u8) -> String {
        format!(
            "metadata:\n  name: {name}\n  namespace: {namespace}\nspec:\n  destination: {location}\n  prefix:\n    v4:\n      - address: {address}\n        size: {size}\n"
        )
    }

    #[test]
    fn test_same_name_in_two_namespaces() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("a.yaml"), resource("eu", "prod", "eu-west", "10.0.0.0", 8)).unwrap();
        fs::write(dir.join("b.yaml"), resource("eu", "staging", "us-east", "192.0.2.0", 24)).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut source = DirectorySource::new(dir, tx);
        source.initial_sync().unwrap();

        let added: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                PrefixListEvent::Added(list) => Some(list.key().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(added, vec!["prod/eu", "staging/eu"]);
    }

    #[test]
    fn test_duplicate_identity_is_shadowed() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("a.yaml"), resource("eu", "prod", "eu-west", "10.0.0.0", 8)).unwrap();
        fs::write(dir.join("b.yaml"), resource("eu", "prod", "us-east", "192.0.2.0", 24)).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut source = DirectorySource::new(dir, tx);
        source.initial_sync().unwrap();
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [PrefixListEvent::Added(list), PrefixListEvent::Synced] if list.destination == "eu-west"
        ));

        // Touching the shadowed file changes nothing while a.yaml holds the name.
        source.reconcile(&dir.join("b.yaml"));
        assert!(drain(&mut rx).is_empty());

        // Removing the holder promotes the shadowed file.
        fs::remove_file(dir.join("a.yaml")).unwrap();
        source.reconcile(&dir.join("a.yaml"));
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [PrefixListEvent::Deleted(old), PrefixListEvent::Added(new)]
                if old.destination == "eu-west" && new.destination == "us-east"
        ));

        // Deleting the promoted file removes only its own list.
        fs::remove_file(dir.join("b.yaml")).unwrap();
        source.reconcile(&dir.join("b.yaml"));
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [PrefixListEvent::Deleted(old)] if old.destination == "us-east"
        ));
    }

    #[tokio::test]
    async fn test_changes_after_watch_are_queued() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().canonicalize().unwrap();
        fs::write(dir.join("eu.yaml"), EU).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut source = DirectorySource::new(&dir, tx);
        let (_watcher, mut changes) = source.sync_and_watch(Duration::from_secs(1)).unwrap();
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [PrefixListEvent::Added(_), PrefixListEvent::Synced]
        ));

        // Renamed into place so the watcher never sees a partial document.
        fs::write(dir.join("us.tmp"), US.replace("10.0.0.0", "192.0.2.0")).unwrap();
        fs::rename(dir.join("us.tmp"), dir.join("us.yaml")).unwrap();

        let mut added = None;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while added.is_none() && tokio::time::Instant::now() < deadline {
            if let Ok(Some(path)) = tokio::time::timeout(Duration::from_millis(200), changes.recv()).await {
                source.reconcile(&path);
            }
            added = drain(&mut rx).into_iter().find_map(|event| match event {
                PrefixListEvent::Added(list) => Some(list),
                _ => None,
            });
        }
        assert_eq!(added.map(|list| list.destination), Some("us-east".to_string()));
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut source = DirectorySource::new("/nonexistent/prefixlist/dir", tx);
        assert!(matches!(
            source.initial_sync(),
            Err(SetupError::InitialList { .. })
        ));
    }
}
