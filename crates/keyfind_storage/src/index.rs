//! Ordered secondary index used by the in-memory store.

use crate::filter::{IndexFilter, IndexInfo};
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};

/// B-tree secondary index from bin value to user keys.
///
/// Supports:
/// - Equality lookups on string and numeric bins
/// - Inclusive range lookups on numeric bins
///
/// Values of the wrong shape for the index kind are not indexed, so a record
/// whose bin holds text never shows up in a numeric index.
#[derive(Debug, Clone)]
pub(crate) struct SecondaryIndex {
    info: IndexInfo,
    entries: BTreeMap<Value, BTreeSet<Value>>,
}

impl SecondaryIndex {
    pub(crate) fn new(info: IndexInfo) -> Self {
        Self {
            info,
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn info(&self) -> &IndexInfo {
        &self.info
    }

    /// Adds a mapping if the value has the indexed shape.
    pub(crate) fn insert(&mut self, value: &Value, user_key: &Value) {
        if self.info.kind.accepts(value) {
            self.entries
                .entry(value.clone())
                .or_default()
                .insert(user_key.clone());
        }
    }

    /// Removes a mapping, dropping the value entry once it is empty.
    pub(crate) fn remove(&mut self, value: &Value, user_key: &Value) {
        if let Some(keys) = self.entries.get_mut(value) {
            keys.remove(user_key);
            if keys.is_empty() {
                self.entries.remove(value);
            }
        }
    }

    /// Returns the user keys matching a filter, in key order.
    pub(crate) fn lookup(&self, filter: &IndexFilter) -> BTreeSet<Value> {
        match filter {
            IndexFilter::Equal { value, .. } => {
                self.entries.get(value).cloned().unwrap_or_default()
            }
            IndexFilter::Range { low, high, .. } => {
                if low > high {
                    return BTreeSet::new();
                }
                self.entries
                    .range(Value::Integer(*low)..=Value::Integer(*high))
                    .flat_map(|(_, keys)| keys.iter().cloned())
                    .collect()
            }
        }
    }

    /// Number of distinct indexed values.
    pub(crate) fn distinct_values(&self) -> usize {
        self.entries.len()
    }
}
