//! Readiness flag shared between the prefix source and the request path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Flips to ready once the prefix source has delivered its initial
/// snapshot. Never flips back.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    synced: Arc<AtomicBool>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_synced(&self) {
        if !self.synced.swap(true, Ordering::AcqRel) {
            tracing::info!("Prefix source synced, plugin ready");
            metrics::record_ready(true);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}
