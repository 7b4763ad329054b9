//! Metrics collection and exposition.
//!
//! # Metrics
//! - `prefixlist_lookups_total` (counter): lookups by family, hit/miss
//! - `prefixlist_events_total` (counter): watcher events by kind
//! - `prefixlist_parse_errors_total` (counter): skipped pairs by family
//! - `prefixlist_entries` (gauge): table entries by family
//! - `prefixlist_ready` (gauge): 1 once the source has synced

use std::net::{IpAddr, SocketAddr};

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_lookup(address: &IpAddr, hit: bool) {
    let family = if address.is_ipv4() { "v4" } else { "v6" };
    let result = if hit { "hit" } else { "miss" };
    counter!("prefixlist_lookups_total", "family" => family, "result" => result).increment(1);
}

pub fn record_event(kind: &'static str) {
    counter!("prefixlist_events_total", "kind" => kind).increment(1);
}

pub fn record_parse_error(family: &'static str) {
    counter!("prefixlist_parse_errors_total", "family" => family).increment(1);
}

pub fn record_table_size(v4_entries: usize, v6_entries: usize) {
    gauge!("prefixlist_entries", "family" => "v4").set(v4_entries as f64);
    gauge!("prefixlist_entries", "family" => "v6").set(v6_entries as f64);
}

pub fn record_ready(ready: bool) {
    gauge!("prefixlist_ready").set(if ready { 1.0 } else { 0.0 });
}
