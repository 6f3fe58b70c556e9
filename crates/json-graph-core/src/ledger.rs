//! Collected-types ledger.
//!
//! Records every class the encoder meets so a caller can build the matching
//! decode-side allow-list from what was actually written.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use crate::class::Class;

#[derive(Debug, Default)]
pub struct TypeLedger {
    classes: Mutex<IndexMap<String, Arc<Class>>>,
}

impl TypeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Arc<Class>>> {
        self.classes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `class`; returns `true` the first time its tag is seen.
    pub fn record(&self, class: &Arc<Class>) -> bool {
        let mut classes = self.lock();
        if classes.contains_key(class.name()) {
            return false;
        }
        classes.insert(class.name().to_string(), Arc::clone(class));
        true
    }

    /// Collected classes in first-seen order, optionally clearing the ledger.
    pub fn read(&self, clear: bool) -> Vec<Arc<Class>> {
        let mut classes = self.lock();
        let out = classes.values().cloned().collect();
        if clear {
            classes.clear();
        }
        out
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.lock().contains_key(tag)
    }

    pub fn reset(&self) {
        tracing::debug!("collected types reset");
        self.lock().clear();
    }
}
