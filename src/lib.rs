//! Prefix list location plugin library.
//!
//! Maps a DNS client address (EDNS Client Subnet, else transport
//! source) to a location label through a live table of CIDR prefixes,
//! and publishes it as request metadata for downstream stages.

// Core
pub mod index;
pub mod plugin;
pub mod routing;
pub mod source;

// Cross-cutting concerns
pub mod admin;
pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod observability;

pub use config::DaemonConfig;
pub use error::SetupError;
pub use lifecycle::Shutdown;
pub use plugin::{PrefixListPlugin, PLUGIN_NAME};
pub use routing::RoutingTable;
