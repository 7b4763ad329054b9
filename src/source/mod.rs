//! Prefix source subsystem.
//!
//! # Data Flow
//! ```text
//! External watcher (directory.rs, or an embedding app's informer)
//!     → PrefixListEvent (Added / Updated / Deleted / Synced)
//!     → adapter.rs
//!         → parse.rs (per-pair parsing, malformed pairs skipped)
//!         → refcounted diff against what each list contributed
//!         → RoutingTable::apply_batch under one write lease
//!     → readiness flag on Synced
//!
//! Directory files:
//!     *.yaml / *.yml
//!     → document.rs (routing: form or metadata/spec form)
//!     → PrefixList
//! ```
//!
//! # Design Decisions
//! - At-least-once delivery: replays of the same event are harmless
//! - Runtime errors are logged and local to the entry or file
//! - No buffering beyond the event channel; sources may resync

pub mod adapter;
pub mod directory;
pub mod document;
pub mod parse;
pub mod types;

pub use adapter::{EventReceiver, EventSender, PrefixListAdapter};
pub use directory::DirectorySource;
pub use document::{parse_document, DocumentError};
pub use parse::PrefixParseError;
pub use types::{AddressPrefix, ListKey, PrefixList, PrefixListEvent, PrefixSet};
