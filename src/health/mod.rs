//! Health subsystem.
//!
//! # Data Flow
//! ```text
//! Prefix source initial burst
//!     → Synced event
//!     → readiness.rs flag set
//!     → plugin ready() / admin /ready report true
//! ```
//!
//! # Design Decisions
//! - Readiness is one-way: once synced, the plugin stays ready
//! - Before readiness, lookups publish the empty label

pub mod readiness;

pub use readiness::Readiness;
