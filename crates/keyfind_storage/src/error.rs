//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a store client.
///
/// These are transport or store-side failures. The engine propagates them
/// unchanged; retry policy, if any, belongs to the client implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the request.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The request did not complete in time.
    #[error("store request timed out")]
    Timeout,

    /// A write expected a different generation than the one stored.
    #[error("generation mismatch: expected {expected}, found {actual}")]
    GenerationMismatch {
        /// Generation the writer expected.
        expected: u32,
        /// Generation currently stored (0 if the record is absent).
        actual: u32,
    },

    /// A create-only write found an existing record.
    #[error("record already exists: {key}")]
    KeyExists {
        /// Display form of the key.
        key: String,
    },

    /// An update-only write found no record.
    #[error("record not found: {key}")]
    KeyNotFound {
        /// Display form of the key.
        key: String,
    },

    /// A filtered scan named a bin without a secondary index.
    #[error("no secondary index on {namespace}.{set}.{bin}")]
    IndexNotFound {
        /// Namespace of the scan.
        namespace: String,
        /// Set of the scan.
        set: String,
        /// Bin the filter referenced.
        bin: String,
    },

    /// An index definition clashes with an existing one.
    #[error("index conflict: {message}")]
    IndexConflict {
        /// Description of the clash.
        message: String,
    },

    /// The request itself was malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates an index conflict error.
    pub fn index_conflict(message: impl Into<String>) -> Self {
        Self::IndexConflict {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
