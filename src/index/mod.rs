//! Interval index subsystem.
//!
//! # Data Flow
//! ```text
//! (prefix, label) from the routing table
//!     → entry.rs (canonical fixed-width [start, end] + label)
//!     → tree.rs (AVL insert/remove keyed by (start, prefix_len, label))
//!
//! Point query (address bytes):
//!     → degenerate probe [a, a]
//!     → tree.rs walk with overlap comparator, pruned by max_end
//!     → most specific covering entry, or none
//! ```
//!
//! # Design Decisions
//! - One index per family, parameterised by byte width (4 or 16)
//! - Overlapping and nested prefixes coexist
//! - Pure in-memory structure; no operation fails

pub mod entry;
pub mod tree;

pub use entry::{overlap_cmp, CidrEntry, Interval, V4Entry, V6Entry};
pub use tree::{IntervalIndex, V4Index, V6Index};
