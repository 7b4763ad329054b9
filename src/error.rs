//! Setup error domain.
//!
//! Everything here is fatal: the plugin refuses to start.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Errors that abort plugin startup.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The directive takes exactly one argument.
    #[error("expected exactly one argument (namespace or directory), got {0}")]
    ArgumentCount(usize),

    /// The directive line names another plugin.
    #[error("unknown directive {0:?}")]
    UnknownDirective(String),

    /// The initial resource set could not be listed.
    #[error("failed to list prefix lists in {path:?}: {source}")]
    InitialList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A namespace source with nothing attached to feed it events.
    #[error("namespace {0:?} has no event source; pass an existing directory")]
    NoEventSource(String),

    /// The directory watcher could not be constructed.
    #[error("failed to start prefix list watcher: {0}")]
    Watcher(#[from] notify::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
