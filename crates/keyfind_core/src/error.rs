//! Error types for the keyfind engine.

use keyfind_storage::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Message returned when an unsorted query carries an offset.
pub const UNSORTED_OFFSET_MESSAGE: &str =
    "Unsorted query must not have offset value. For retrieving paged results use sorted query.";

/// Errors that can occur while finding or writing entities.
///
/// A missing record is not an error on the read path: `find_by_id` returns
/// `Ok(None)` and streams simply omit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The query is not executable as written.
    #[error("{message}")]
    InvalidQuery {
        /// Human-readable reason, surfaced unchanged.
        message: String,
    },

    /// The entity type's metadata is contradictory.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the conflict.
        message: String,
    },

    /// Error reported by the store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An entity could not be encoded or decoded.
    #[error("mapping error: {message}")]
    Mapping {
        /// Description of the mapping failure.
        message: String,
    },

    /// A versioned write observed a different generation than expected.
    #[error("optimistic locking failure on {key} (expected version {expected:?})")]
    OptimisticLockingFailure {
        /// Record key.
        key: String,
        /// Version the write was conditioned on.
        expected: Option<u32>,
    },

    /// An insert hit an existing record.
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// Record key.
        key: String,
    },

    /// An update targeted a record that does not exist.
    #[error("entity not found: {key}")]
    EntityNotFound {
        /// Record key.
        key: String,
    },
}

impl CoreError {
    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates the error for an unsorted query with an offset.
    pub fn unsorted_offset() -> Self {
        Self::invalid_query(UNSORTED_OFFSET_MESSAGE)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a mapping error.
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    /// Creates a mapping error for a missing or mistyped bin.
    pub fn missing_bin(bin: &str, expected: &str) -> Self {
        Self::mapping(format!("bin '{bin}' is missing or not {expected}"))
    }

    /// Returns true for errors raised before the store was contacted.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidQuery { .. } | CoreError::Configuration { .. }
        )
    }
}
