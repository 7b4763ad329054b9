//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured fields (list, prefix, address) rather than formatted text
//! - Metric updates are no-ops until an exporter is installed
//! - Lookup metrics are recorded inside the lazy producer, so unread
//!   keys cost nothing

pub mod logging;
pub mod metrics;
