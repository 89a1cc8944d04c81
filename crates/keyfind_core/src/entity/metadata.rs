//! Static per-type metadata.

use crate::error::{CoreError, CoreResult};
use keyfind_storage::Ttl;

/// How an entity type's records expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpirationPolicy {
    /// The namespace default applies.
    #[default]
    StoreDefault,
    /// Records never expire.
    Never,
    /// Every write sets the same expiration, in seconds.
    Fixed(u32),
    /// Each entity carries its own expiration, read through
    /// [`EntityCodec::expiration`](crate::EntityCodec::expiration).
    Property,
}

/// Static description of an entity type.
///
/// Built with `const` setters so implementations can return a constant:
///
/// ```rust
/// use keyfind_core::{EntityMetadata, ExpirationPolicy};
///
/// const DOCUMENT: EntityMetadata = EntityMetadata::new("document")
///     .versioned()
///     .touch_on_read()
///     .expiration(ExpirationPolicy::Fixed(60));
///
/// assert!(DOCUMENT.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMetadata {
    /// Set the records live in.
    pub set: &'static str,
    /// Whether the entity exposes the record generation as its version.
    pub versioned: bool,
    /// Whether every read also rewrites the record's expiration.
    pub touch_on_read: bool,
    /// How records expire.
    pub expiration: ExpirationPolicy,
}

impl EntityMetadata {
    /// Creates unversioned metadata for a set with default expiration.
    #[must_use]
    pub const fn new(set: &'static str) -> Self {
        Self {
            set,
            versioned: false,
            touch_on_read: false,
            expiration: ExpirationPolicy::StoreDefault,
        }
    }

    /// Marks the type as versioned.
    #[must_use]
    pub const fn versioned(mut self) -> Self {
        self.versioned = true;
        self
    }

    /// Enables touch-on-read.
    #[must_use]
    pub const fn touch_on_read(mut self) -> Self {
        self.touch_on_read = true;
        self
    }

    /// Sets the expiration policy.
    #[must_use]
    pub const fn expiration(mut self, policy: ExpirationPolicy) -> Self {
        self.expiration = policy;
        self
    }

    /// Checks that the settings can be honoured together.
    ///
    /// Touch-on-read rewrites expiration from type-level settings alone, so
    /// it cannot be combined with a per-entity expiration property.
    pub fn validate(&self) -> CoreResult<()> {
        if self.touch_on_read && self.expiration == ExpirationPolicy::Property {
            return Err(CoreError::configuration(format!(
                "touch on read is not supported for entity with expiration property (set '{}')",
                self.set
            )));
        }
        Ok(())
    }

    /// Expiration applied by a touch-on-read rewrite.
    pub fn touch_ttl(&self) -> Ttl {
        match self.expiration {
            ExpirationPolicy::Never => Ttl::Never,
            ExpirationPolicy::Fixed(seconds) => Ttl::Seconds(seconds),
            ExpirationPolicy::StoreDefault | ExpirationPolicy::Property => Ttl::StoreDefault,
        }
    }

    /// Expiration for a write, given the entity's own expiration if any.
    pub fn write_ttl(&self, entity_expiration: Option<u32>) -> Ttl {
        match self.expiration {
            ExpirationPolicy::Property => entity_expiration.map_or(Ttl::StoreDefault, Ttl::Seconds),
            _ => self.touch_ttl(),
        }
    }
}
