//! Fixture entities and template helpers.
//!
//! The entity types cover every metadata combination the engine treats
//! differently: plain, versioned, touch-on-read, touch-on-read with an
//! expiration property (a configuration error) and fixed expiration.

use keyfind_core::{
    CoreResult, EntityCodec, EntityMetadata, EntityStream, ExpirationPolicy, MappedRecord,
    Template, TemplateConfig,
};
use keyfind_storage::{Bins, IndexKind, MemoryStore, MemoryStoreConfig, StatsSnapshot, Value};
use futures::TryStreamExt;
use uuid::Uuid;

/// Returns a fresh random id.
pub fn next_id() -> String {
    Uuid::new_v4().to_string()
}

/// Collects a stream into a vector, failing on the first error.
pub async fn collect<T>(stream: EntityStream<T>) -> CoreResult<Vec<T>> {
    stream.try_collect().await
}

/// A template over a fresh in-memory store.
///
/// Dereferences to [`Template`], and keeps the store handle around so tests
/// can inspect call counters, inject faults or move the clock.
pub struct TestTemplate {
    /// The backing store.
    pub store: MemoryStore,
    /// The template under test.
    pub template: Template,
}

impl TestTemplate {
    /// Creates a template with default configuration.
    pub fn new() -> Self {
        Self::with_config(TemplateConfig::default(), MemoryStoreConfig::default())
    }

    /// Creates a template with explicit configuration.
    pub fn with_config(config: TemplateConfig, store_config: MemoryStoreConfig) -> Self {
        let store = MemoryStore::with_config(store_config);
        let template = Template::with_store(config, store.clone());
        Self { store, template }
    }

    /// Creates a template with the person indexes: numeric on `age`, string
    /// on `lastname` and `firstname`.
    pub fn with_person_indexes() -> Self {
        let test = Self::new();
        test.create_person_indexes();
        test
    }

    /// Creates the person indexes. Safe to call repeatedly.
    pub fn create_person_indexes(&self) {
        for (name, bin, kind) in [
            ("age_index", "age", IndexKind::Numeric),
            ("last_name_index", "lastname", IndexKind::String),
            ("first_name_index", "firstname", IndexKind::String),
        ] {
            self.template
                .ensure_index::<Person>(name, bin, kind)
                .expect("Failed to create person index");
        }
    }

    /// Current store call counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.store.stats().snapshot()
    }

    /// Zeroes the store call counters.
    pub fn reset_stats(&self) {
        self.store.stats().reset();
    }
}

impl Default for TestTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestTemplate {
    type Target = Template;

    fn deref(&self) -> &Self::Target {
        &self.template
    }
}

/// A person, the workhorse fixture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Person {
    /// User key.
    pub id: String,
    /// First name.
    pub firstname: String,
    /// Last name.
    pub lastname: String,
    /// Age in years.
    pub age: i64,
}

impl Person {
    /// Creates a person.
    pub fn new(id: impl Into<String>, firstname: &str, lastname: &str, age: i64) -> Self {
        Self {
            id: id.into(),
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            age,
        }
    }

    /// Creates a person with a random id.
    pub fn random(firstname: &str, lastname: &str, age: i64) -> Self {
        Self::new(next_id(), firstname, lastname, age)
    }

    /// `count` people sharing a last name, with distinct first names and
    /// ages starting at 21.
    pub fn family(lastname: &str, count: usize) -> Vec<Self> {
        (0..count)
            .map(|n| {
                let age = 21 + i64::try_from(n).unwrap_or(i64::MAX - 21);
                Self::random(&format!("Member{n:02}"), lastname, age)
            })
            .collect()
    }
}

impl EntityCodec for Person {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("person")
    }

    fn id(&self) -> Value {
        Value::from(self.id.as_str())
    }

    fn encode(&self) -> CoreResult<Bins> {
        let mut bins = Bins::new();
        bins.insert("firstname".into(), Value::from(self.firstname.as_str()));
        bins.insert("lastname".into(), Value::from(self.lastname.as_str()));
        bins.insert("age".into(), Value::from(self.age));
        Ok(bins)
    }

    fn decode(record: &MappedRecord) -> CoreResult<Self> {
        Ok(Self {
            id: record.id_text()?,
            firstname: record.text("firstname")?,
            lastname: record.text("lastname")?,
            age: record.integer("age")?,
        })
    }
}

/// A versioned document whose version is the record generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedDocument {
    /// User key.
    pub id: String,
    /// Payload.
    pub field: String,
    /// Version, `None` until persisted.
    pub version: Option<u32>,
}

impl VersionedDocument {
    /// Creates an unpersisted document.
    pub fn new(id: impl Into<String>, field: &str) -> Self {
        Self {
            id: id.into(),
            field: field.to_string(),
            version: None,
        }
    }
}

impl EntityCodec for VersionedDocument {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("versioned-set").versioned()
    }

    fn id(&self) -> Value {
        Value::from(self.id.as_str())
    }

    fn encode(&self) -> CoreResult<Bins> {
        let mut bins = Bins::new();
        bins.insert("field".into(), Value::from(self.field.as_str()));
        Ok(bins)
    }

    fn decode(record: &MappedRecord) -> CoreResult<Self> {
        Ok(Self {
            id: record.id_text()?,
            field: record.text("field")?,
            version: None,
        })
    }

    fn version(&self) -> Option<u32> {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = Some(version);
    }
}

/// A versioned document that is rewritten on every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchOnReadDocument {
    /// User key.
    pub id: String,
    /// Payload.
    pub content: String,
    /// Version, `None` until persisted.
    pub version: Option<u32>,
}

impl TouchOnReadDocument {
    /// Expiration every touch resets to, in seconds.
    pub const EXPIRATION: u32 = 60;

    /// Creates an unpersisted document.
    pub fn new(id: impl Into<String>, content: &str) -> Self {
        Self {
            id: id.into(),
            content: content.to_string(),
            version: None,
        }
    }
}

impl EntityCodec for TouchOnReadDocument {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("touch-on-read")
            .versioned()
            .touch_on_read()
            .expiration(ExpirationPolicy::Fixed(Self::EXPIRATION))
    }

    fn id(&self) -> Value {
        Value::from(self.id.as_str())
    }

    fn encode(&self) -> CoreResult<Bins> {
        let mut bins = Bins::new();
        bins.insert("content".into(), Value::from(self.content.as_str()));
        Ok(bins)
    }

    fn decode(record: &MappedRecord) -> CoreResult<Self> {
        Ok(Self {
            id: record.id_text()?,
            content: record.text("content")?,
            version: None,
        })
    }

    fn version(&self) -> Option<u32> {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = Some(version);
    }
}

/// Touch-on-read combined with a per-entity expiration. Writable, but every
/// read fails with a configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchOnReadExpiringDocument {
    /// User key.
    pub id: String,
    /// Seconds until expiry.
    pub expiration: Option<u32>,
    /// Version, `None` until persisted.
    pub version: Option<u32>,
}

impl TouchOnReadExpiringDocument {
    /// Creates an unpersisted document.
    pub fn new(id: impl Into<String>, expiration: u32) -> Self {
        Self {
            id: id.into(),
            expiration: Some(expiration),
            version: None,
        }
    }
}

impl EntityCodec for TouchOnReadExpiringDocument {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("touch-on-read-expiring")
            .versioned()
            .touch_on_read()
            .expiration(ExpirationPolicy::Property)
    }

    fn id(&self) -> Value {
        Value::from(self.id.as_str())
    }

    fn encode(&self) -> CoreResult<Bins> {
        Ok(Bins::new())
    }

    fn decode(record: &MappedRecord) -> CoreResult<Self> {
        Ok(Self {
            id: record.id_text()?,
            expiration: record.ttl,
            version: None,
        })
    }

    fn version(&self) -> Option<u32> {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = Some(version);
    }

    fn expiration(&self) -> Option<u32> {
        self.expiration
    }
}

/// An unversioned document with a type-wide expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedExpirationDocument {
    /// User key.
    pub id: String,
    /// Payload.
    pub content: String,
}

impl FixedExpirationDocument {
    /// Expiration applied on every write, in seconds.
    pub const EXPIRATION: u32 = 5;

    /// Creates a document.
    pub fn new(id: impl Into<String>, content: &str) -> Self {
        Self {
            id: id.into(),
            content: content.to_string(),
        }
    }
}

impl EntityCodec for FixedExpirationDocument {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("fixed-expiration").expiration(ExpirationPolicy::Fixed(Self::EXPIRATION))
    }

    fn id(&self) -> Value {
        Value::from(self.id.as_str())
    }

    fn encode(&self) -> CoreResult<Bins> {
        let mut bins = Bins::new();
        bins.insert("content".into(), Value::from(self.content.as_str()));
        Ok(bins)
    }

    fn decode(record: &MappedRecord) -> CoreResult<Self> {
        Ok(Self {
            id: record.id_text()?,
            content: record.text("content")?,
        })
    }
}
