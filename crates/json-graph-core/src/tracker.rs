//! Per-call reference bookkeeping.
//!
//! [`ReferenceTracker`] assigns indices to composites during an encode call;
//! [`FoundTable`] maps indices back to live values during a decode call.
//! Both are created fresh for every call and dropped with it.

use std::collections::HashMap;

use crate::error::MalformedInput;
use crate::value::Value;

/// Encode-side identity table.
///
/// Every registered value is retained in `observed` for the duration of the
/// call. Handlers may pass temporaries to the encoder; holding them keeps
/// their addresses from being reused by a later allocation and mistaken for
/// a back-reference.
#[derive(Default)]
pub struct ReferenceTracker {
    observed: Vec<Value>,
    index: HashMap<usize, usize>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index previously assigned to this composite, if any.
    pub fn lookup(&self, value: &Value) -> Option<usize> {
        value.identity().and_then(|id| self.index.get(&id).copied())
    }

    /// Assigns the next index to `value`.
    ///
    /// Callers check [`ReferenceTracker::lookup`] first; primitives get an
    /// index but no identity entry.
    pub fn register(&mut self, value: &Value) -> usize {
        let idx = self.observed.len();
        if let Some(id) = value.identity() {
            self.index.insert(id, idx);
        }
        self.observed.push(value.clone());
        idx
    }

    /// Allocates an index that can never be referenced again.
    pub fn reserve(&mut self) -> usize {
        self.observed.push(Value::Undefined);
        self.observed.len() - 1
    }

    /// Number of indices handed out so far.
    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// Forgets every index from `len` on, identity entries included.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.observed.len() {
            return;
        }
        self.observed.truncate(len);
        self.index.retain(|_, idx| *idx < len);
    }
}

/// Decode-side table from reference index to the (possibly still filling)
/// container registered under it.
#[derive(Default)]
pub struct FoundTable {
    slots: HashMap<usize, Value>,
    inserted: Vec<usize>,
}

impl FoundTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.slots.get(&idx)
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.slots.contains_key(&idx)
    }

    /// Registers `value` under `idx`. An index may be claimed only once.
    pub fn insert(&mut self, idx: usize, value: Value) -> Result<(), MalformedInput> {
        if self.slots.contains_key(&idx) {
            return Err(MalformedInput::DuplicateReference(idx));
        }
        self.slots.insert(idx, value);
        self.inserted.push(idx);
        Ok(())
    }

    /// Number of registrations so far.
    pub fn len(&self) -> usize {
        self.inserted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }

    /// Drops every registration made after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        while self.inserted.len() > len {
            if let Some(idx) = self.inserted.pop() {
                self.slots.remove(&idx);
            }
        }
    }

    /// Resolves a back-reference.
    pub fn resolve(&self, idx: usize) -> Result<Value, MalformedInput> {
        self.slots
            .get(&idx)
            .cloned()
            .ok_or(MalformedInput::UnresolvedReference(idx))
    }
}
