//! Entity codec trait and the decoded-record view handed to it.

use super::metadata::EntityMetadata;
use crate::error::{CoreError, CoreResult};
use keyfind_storage::{Bins, RawRecord, Value};

/// Trait for types that can be found and written through a
/// [`Template`](crate::Template).
///
/// Implementors must provide:
/// - `metadata()`: the set and behavioural flags of the type
/// - `id()`: the stable, immutable user key
/// - `encode()`: the bins to write (identity and version are not bins)
/// - `decode()`: the entity rebuilt from a stored record
///
/// Versioned types also override `version` and `set_version`; types with
/// [`ExpirationPolicy::Property`](crate::ExpirationPolicy::Property)
/// override `expiration`.
///
/// # Example
///
/// ```rust
/// use keyfind_core::{CoreResult, EntityCodec, EntityMetadata, MappedRecord};
/// use keyfind_storage::{Bins, Value};
///
/// struct Person {
///     id: String,
///     age: i64,
/// }
///
/// impl EntityCodec for Person {
///     fn metadata() -> EntityMetadata {
///         EntityMetadata::new("person")
///     }
///
///     fn id(&self) -> Value {
///         Value::from(self.id.as_str())
///     }
///
///     fn encode(&self) -> CoreResult<Bins> {
///         let mut bins = Bins::new();
///         bins.insert("age".into(), Value::from(self.age));
///         Ok(bins)
///     }
///
///     fn decode(record: &MappedRecord) -> CoreResult<Self> {
///         Ok(Person {
///             id: record.id_text()?,
///             age: record.integer("age")?,
///         })
///     }
/// }
/// ```
pub trait EntityCodec: Sized + Send + 'static {
    /// Static metadata for the type.
    fn metadata() -> EntityMetadata;

    /// Returns the entity's user key.
    ///
    /// This must not change once the entity is persisted.
    fn id(&self) -> Value;

    /// Encodes the entity into bins.
    fn encode(&self) -> CoreResult<Bins>;

    /// Decodes an entity from a stored record.
    fn decode(record: &MappedRecord) -> CoreResult<Self>;

    /// Current version, for versioned types. `None` means never persisted.
    fn version(&self) -> Option<u32> {
        None
    }

    /// Stores a version observed from, or produced by, the store.
    fn set_version(&mut self, _version: u32) {}

    /// Per-entity expiration in seconds, for the `Property` policy.
    fn expiration(&self) -> Option<u32> {
        None
    }
}

/// A stored record as seen by a decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRecord {
    /// User key of the record.
    pub id: Value,
    /// Stored bins.
    pub bins: Bins,
    /// Record generation, which versioned types expose as their version.
    pub version: u32,
    /// Seconds until expiry, `None` if the record never expires.
    pub ttl: Option<u32>,
}

impl MappedRecord {
    /// Returns a bin value.
    pub fn bin(&self, name: &str) -> Option<&Value> {
        self.bins.get(name)
    }

    /// Returns a text bin, failing if missing or not text.
    pub fn text(&self, name: &str) -> CoreResult<String> {
        self.bin(name)
            .and_then(Value::as_text)
            .map(str::to_string)
            .ok_or_else(|| CoreError::missing_bin(name, "text"))
    }

    /// Returns a text bin if present.
    pub fn optional_text(&self, name: &str) -> CoreResult<Option<String>> {
        match self.bin(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(_) => Err(CoreError::missing_bin(name, "text")),
        }
    }

    /// Returns an integer bin, failing if missing or not an integer.
    pub fn integer(&self, name: &str) -> CoreResult<i64> {
        self.bin(name)
            .and_then(Value::as_integer)
            .ok_or_else(|| CoreError::missing_bin(name, "an integer"))
    }

    /// Returns the user key as text.
    pub fn id_text(&self) -> CoreResult<String> {
        self.id
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| CoreError::mapping(format!("user key {} is not text", self.id)))
    }
}

impl From<RawRecord> for MappedRecord {
    fn from(raw: RawRecord) -> Self {
        Self {
            id: raw.key.user_key,
            bins: raw.bins,
            version: raw.generation,
            ttl: raw.ttl,
        }
    }
}
