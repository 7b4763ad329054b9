//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path (many concurrent readers):
//!     client address
//!     → table.rs locate() under a shared read lease
//!     → v4 or v6 interval index
//!     → location label or none
//!
//! Update path (prefix source adapter):
//!     TableOp batch
//!     → table.rs apply_batch() under one exclusive write lease
//!     → insert/remove on the interval indices
//! ```
//!
//! # Design Decisions
//! - One table per plugin instance, shared via Arc
//! - Readers never observe a partially applied batch
//! - Lookups never fail; a miss is `None`

pub mod table;

pub use table::{PrefixEntry, RoutingTable, TableOp, TableStats};
