//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Source identifier → table + readiness → adapter → source tasks
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → adapter / watcher loops exit → join
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a source that cannot be listed aborts startup
//! - The table exists (empty, not ready) before any source task runs
//! - Shutdown has timeout: tasks still running after the deadline are abandoned

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, Running};
