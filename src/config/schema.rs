//! Configuration schema definitions.
//!
//! This module defines the daemon configuration structure. All types
//! derive Serde traits for deserialization from the TOML config file.
//! The prefix list source itself is the single positional argument,
//! not part of this file.

use serde::{Deserialize, Serialize};

/// Root configuration for the prefix list daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DaemonConfig {
    /// Prefix source behaviour.
    pub source: SourceConfig,

    /// Admin HTTP surface.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Prefix source settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Keep watching a directory source after the initial sync.
    pub watch: bool,

    /// Poll interval for watcher backends that poll (seconds).
    pub poll_interval_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            watch: true,
            poll_interval_secs: 2,
        }
    }
}

/// Admin HTTP settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:8181").
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8181".to_string(),
        }
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing filter directive; `RUST_LOG` takes precedence.
    pub log_filter: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "edge_prefixlist=info,prefixlistd=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9153".to_string(),
        }
    }
}
