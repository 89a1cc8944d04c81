//! Keys, raw records and write policies.

use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Named field values of a record.
pub type Bins = BTreeMap<String, Value>;

/// Address of a record: namespace, set and user key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    /// Namespace (top-level container).
    pub namespace: String,
    /// Set (one per entity type).
    pub set: String,
    /// Application-supplied identifier.
    pub user_key: Value,
}

impl Key {
    /// Creates a key.
    pub fn new(
        namespace: impl Into<String>,
        set: impl Into<String>,
        user_key: impl Into<Value>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            user_key: user_key.into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.set, self.user_key)
    }
}

/// A record as the store returns it.
///
/// `generation` is assigned by the store: 1 after the first successful write,
/// then incremented by exactly one per write to the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Record address.
    pub key: Key,
    /// Field values.
    pub bins: Bins,
    /// Store-assigned write counter.
    pub generation: u32,
    /// Seconds until expiry, `None` if the record never expires.
    pub ttl: Option<u32>,
}

impl RawRecord {
    /// Returns the value of a bin.
    pub fn bin(&self, name: &str) -> Option<&Value> {
        self.bins.get(name)
    }
}

/// Expiration requested by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Use the store's configured default.
    #[default]
    StoreDefault,
    /// Never expire.
    Never,
    /// Expire after this many seconds.
    Seconds(u32),
}

/// What a write requires of the existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordExists {
    /// Create or replace.
    #[default]
    Upsert,
    /// Fail if the record exists.
    CreateOnly,
    /// Fail if the record does not exist.
    UpdateOnly,
}

/// Options for a single write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritePolicy {
    /// Existence requirement.
    pub exists: RecordExists,
    /// Generation the record must currently have, if any.
    pub expected_generation: Option<u32>,
    /// Expiration to apply.
    pub ttl: Ttl,
}

impl WritePolicy {
    /// Creates a policy with default values (upsert, no generation check).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the existence requirement.
    #[must_use]
    pub const fn exists(mut self, exists: RecordExists) -> Self {
        self.exists = exists;
        self
    }

    /// Requires the stored generation to equal `generation`.
    #[must_use]
    pub const fn expect_generation(mut self, generation: u32) -> Self {
        self.expected_generation = Some(generation);
        self
    }

    /// Sets the expiration.
    #[must_use]
    pub const fn ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }
}
