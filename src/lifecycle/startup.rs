//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the routing table and readiness flag
//! - Wire the adapter to the prefix source named by the identifier
//! - Start background tasks (adapter loop, directory watcher)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Directory mode installs the watcher, then performs the initial sync
//!   before returning, so the `Synced` event is already queued behind the
//!   initial `Added` events and later changes queue behind both
//! - Namespace mode hands the event sender to the embedding application,
//!   whose watcher feeds the same adapter

use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SourceConfig;
use crate::error::SetupError;
use crate::health::Readiness;
use crate::lifecycle::Shutdown;
use crate::plugin::setup::SourceIdentifier;
use crate::plugin::PrefixListPlugin;
use crate::routing::RoutingTable;
use crate::source::{DirectorySource, EventSender, PrefixListAdapter};

/// Handles to a started prefix list source.
pub struct Running {
    table: Arc<RoutingTable>,
    readiness: Readiness,
    adapter: Arc<PrefixListAdapter>,
    events: EventSender,
    tasks: Vec<JoinHandle<()>>,
    _watcher: Option<RecommendedWatcher>,
}

impl Running {
    /// A pipeline stage bound to this source's table.
    pub fn plugin(&self) -> PrefixListPlugin {
        PrefixListPlugin::new(self.table.clone(), self.readiness.clone())
    }

    pub fn table(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    pub fn adapter(&self) -> &Arc<PrefixListAdapter> {
        &self.adapter
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    /// Sender for prefix list events. In namespace mode the embedding
    /// application's resource watcher pushes its events here.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Wait for the background tasks to exit, up to `timeout`.
    pub async fn join(self, timeout: Duration) {
        let tasks = self.tasks;
        let all = async move {
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::error!(error = %e, "Prefix list task failed");
                }
            }
        };
        if tokio::time::timeout(timeout, all).await.is_err() {
            tracing::warn!(timeout_secs = timeout.as_secs(), "Prefix list tasks did not stop in time");
        }
    }
}

/// Start the prefix list source named by `identifier`.
pub fn start(
    identifier: SourceIdentifier,
    config: &SourceConfig,
    shutdown: &Shutdown,
) -> Result<Running, SetupError> {
    let table = Arc::new(RoutingTable::new());
    let readiness = Readiness::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut adapter = PrefixListAdapter::new(table.clone(), readiness.clone());
    let mut tasks = Vec::new();
    let mut watcher = None;

    match identifier {
        SourceIdentifier::Directory(dir) => {
            let dir = dir.canonicalize().map_err(|source| SetupError::InitialList {
                path: dir.clone(),
                source,
            })?;
            tracing::info!(dir = ?dir, watch = config.watch, "Starting directory prefix source");

            let mut source = DirectorySource::new(dir, tx.clone());
            if config.watch {
                let (guard, changes) =
                    source.sync_and_watch(Duration::from_secs(config.poll_interval_secs))?;
                watcher = Some(guard);
                tasks.push(tokio::spawn(source.run(changes, shutdown.subscribe())));
            } else {
                source.initial_sync()?;
            }
        }
        SourceIdentifier::Namespace(namespace) => {
            tracing::info!(namespace = %namespace, "Waiting for prefix list events in namespace");
            adapter = adapter.with_namespace(namespace);
        }
    }

    let adapter = Arc::new(adapter);
    tasks.push(tokio::spawn(adapter.clone().run(rx, shutdown.subscribe())));

    Ok(Running {
        table,
        readiness,
        adapter,
        events: tx,
        tasks,
        _watcher: watcher,
    })
}
