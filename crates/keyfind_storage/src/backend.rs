//! Store client and index catalog traits.

use crate::error::StoreResult;
use crate::filter::{IndexFilter, IndexInfo, IndexKind};
use crate::record::{Bins, Key, RawRecord, Ttl, WritePolicy};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy, single-pass sequence of records produced by a scan.
pub type RecordStream = BoxStream<'static, StoreResult<RawRecord>>;

/// Asynchronous access to a key/value store with per-record generations.
///
/// Implementations own transport concerns: pooling, wire format, socket
/// level retries. Callers see records, generations and TTLs only.
///
/// # Invariants
///
/// - `get` of an absent key is `Ok(None)`, never a default-valued record
/// - generations start at 1 and grow by exactly one per successful write
/// - `scan` does no work until the stream is polled, and dropping the
///   stream releases the scan
/// - no method bumps a generation except `put` and `touch`
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Reads one record.
    async fn get(&self, key: &Key) -> StoreResult<Option<RawRecord>>;

    /// Reads several records in one call.
    ///
    /// The result is positional: one entry per requested key, in request
    /// order, with `None` for absent keys.
    async fn get_many(&self, keys: &[Key]) -> StoreResult<Vec<(Key, Option<RawRecord>)>>;

    /// Scans a set, optionally through a secondary index.
    ///
    /// Record order is unspecified.
    fn scan(&self, namespace: &str, set: &str, filter: Option<IndexFilter>) -> RecordStream;

    /// Writes a record and returns its new generation.
    async fn put(&self, key: &Key, bins: Bins, policy: &WritePolicy) -> StoreResult<u32>;

    /// Rewrites a record's expiration, bumping its generation.
    ///
    /// Returns the record as it is after the rewrite, or `None` if absent.
    async fn touch(&self, key: &Key, ttl: Ttl) -> StoreResult<Option<RawRecord>>;

    /// Deletes a record. Returns true if it existed.
    async fn delete(&self, key: &Key) -> StoreResult<bool>;
}

/// Secondary index administration and lookup.
pub trait IndexCatalog: Send + Sync {
    /// Creates an index unless an identical one exists.
    ///
    /// Calling twice with the same arguments is a no-op. A different
    /// definition under the same name, or a second index on the same bin,
    /// is an error.
    fn ensure_index(
        &self,
        namespace: &str,
        set: &str,
        name: &str,
        bin: &str,
        kind: IndexKind,
    ) -> StoreResult<()>;

    /// Returns the index covering a bin, if any.
    fn find_index(&self, namespace: &str, set: &str, bin: &str) -> Option<IndexInfo>;
}
