//! Per-request metadata bag.
//!
//! Values are deferred producers: a stage registers a closure, and the
//! closure only runs when a downstream stage reads the key.

use std::collections::HashMap;
use std::fmt;

type Producer = Box<dyn Fn() -> String + Send + Sync>;

/// Mapping from metadata key to a lazily evaluated string value.
#[derive(Default)]
pub struct MetadataBag {
    values: HashMap<String, Producer>,
}

impl MetadataBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `producer` under `key`, replacing any earlier producer.
    pub fn set_value_func<F>(&mut self, key: impl Into<String>, producer: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.values.insert(key.into(), Box::new(producer));
    }

    /// Evaluate the producer for `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|producer| producer())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl fmt::Debug for MetadataBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
