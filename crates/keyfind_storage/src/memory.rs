//! In-memory store for testing and embedding.

use crate::backend::{IndexCatalog, RecordStream, StoreClient};
use crate::error::{StoreError, StoreResult};
use crate::filter::{IndexFilter, IndexInfo, IndexKind};
use crate::index::SecondaryIndex;
use crate::record::{Bins, Key, RawRecord, RecordExists, Ttl, WritePolicy};
use crate::stats::StoreStats;
use crate::value::Value;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Records fetched per scan page.
    pub scan_page_size: usize,
    /// Expiration applied to writes that ask for the store default.
    /// `None` means such records never expire.
    pub default_ttl: Option<u32>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            scan_page_size: 64,
            default_ttl: None,
        }
    }
}

impl MemoryStoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scan page size (clamped to at least 1).
    #[must_use]
    pub fn scan_page_size(mut self, size: usize) -> Self {
        self.scan_page_size = size.max(1);
        self
    }

    /// Sets the default expiration in seconds.
    #[must_use]
    pub const fn default_ttl(mut self, ttl: Option<u32>) -> Self {
        self.default_ttl = ttl;
        self
    }
}

type SetId = (String, String);
type IndexId = (String, String, String);

#[derive(Debug, Clone)]
struct StoredRecord {
    bins: Bins,
    generation: u32,
    expires_at: Option<Instant>,
}

impl StoredRecord {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    sets: HashMap<SetId, BTreeMap<Value, StoredRecord>>,
    indexes: HashMap<IndexId, SecondaryIndex>,
}

impl StoreState {
    fn unindex(&mut self, key: &Key, bins: &Bins) {
        for ((ns, set, bin), index) in &mut self.indexes {
            if *ns == key.namespace && *set == key.set {
                if let Some(value) = bins.get(bin) {
                    index.remove(value, &key.user_key);
                }
            }
        }
    }

    fn reindex(&mut self, key: &Key, bins: &Bins) {
        for ((ns, set, bin), index) in &mut self.indexes {
            if *ns == key.namespace && *set == key.set {
                if let Some(value) = bins.get(bin) {
                    index.insert(value, &key.user_key);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    config: MemoryStoreConfig,
    state: RwLock<StoreState>,
    stats: StoreStats,
    faults: Mutex<VecDeque<StoreError>>,
    clock_offset: Mutex<Duration>,
    active_scans: AtomicUsize,
}

impl Shared {
    fn now(&self) -> Instant {
        Instant::now() + *self.clock_offset.lock()
    }

    /// Consumes one injected fault, if any is queued.
    fn take_fault(&self) -> StoreResult<()> {
        match self.faults.lock().pop_front() {
            Some(err) => {
                self.stats.record_error();
                warn!(error = %err, "memory store returning injected fault");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn expiry(&self, ttl: Ttl, now: Instant) -> Option<Instant> {
        let seconds = match ttl {
            Ttl::StoreDefault => self.config.default_ttl,
            Ttl::Never => None,
            Ttl::Seconds(n) => Some(n),
        };
        seconds.map(|s| now + Duration::from_secs(u64::from(s)))
    }

    fn to_raw(key: Key, record: &StoredRecord, now: Instant) -> RawRecord {
        let ttl = record.expires_at.map(|at| {
            let left = at.saturating_duration_since(now);
            let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
            u32::try_from(secs).unwrap_or(u32::MAX)
        });
        RawRecord {
            key,
            bins: record.bins.clone(),
            generation: record.generation,
            ttl,
        }
    }

    fn read(&self, key: &Key, now: Instant) -> Option<RawRecord> {
        let state = self.state.read();
        state
            .sets
            .get(&(key.namespace.clone(), key.set.clone()))
            .and_then(|records| records.get(&key.user_key))
            .filter(|record| record.is_live(now))
            .map(|record| Self::to_raw(key.clone(), record, now))
    }
}

/// An in-memory key/value store with generations, TTLs and secondary indexes.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - Embedding where durability is not required
///
/// Scans are paged: each poll that exhausts the current page fetches the
/// next `scan_page_size` records under a short read lock, so a scan never
/// holds the store while the caller processes records. Record order within
/// a scan follows the user key, which callers must not rely on.
///
/// # Thread Safety
///
/// The store is `Send + Sync` and cheap to clone; clones share state.
///
/// # Example
///
/// ```rust
/// use keyfind_storage::{Key, MemoryStore, StoreClient, Value, WritePolicy};
/// use std::collections::BTreeMap;
///
/// # futures::executor::block_on(async {
/// let store = MemoryStore::new();
/// let key = Key::new("test", "person", "dave");
/// let mut bins = BTreeMap::new();
/// bins.insert("name".to_string(), Value::from("Dave"));
///
/// let generation = store.put(&key, bins, &WritePolicy::new()).await.unwrap();
/// assert_eq!(generation, 1);
/// assert!(store.get(&key).await.unwrap().is_some());
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates an empty store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given configuration.
    #[must_use]
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                ..Shared::default()
            }),
        }
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &MemoryStoreConfig {
        &self.shared.config
    }

    /// Returns the call counters.
    pub fn stats(&self) -> &StoreStats {
        &self.shared.stats
    }

    /// Number of scans whose streams are still alive.
    pub fn active_scans(&self) -> usize {
        self.shared.active_scans.load(Ordering::SeqCst)
    }

    /// Makes the next store call (or scan page fetch) fail with `error`.
    ///
    /// Faults queue up; each call consumes one.
    pub fn fail_next(&self, error: StoreError) {
        self.shared.faults.lock().push_back(error);
    }

    /// Moves the store clock forward, expiring records whose TTL elapses.
    pub fn advance_clock(&self, by: Duration) {
        *self.shared.clock_offset.lock() += by;
    }

    /// Number of live records in a set.
    pub fn record_count(&self, namespace: &str, set: &str) -> usize {
        let now = self.shared.now();
        let state = self.shared.state.read();
        state
            .sets
            .get(&(namespace.to_string(), set.to_string()))
            .map_or(0, |records| {
                records.values().filter(|r| r.is_live(now)).count()
            })
    }

    /// Drops an index by name. Returns true if it existed.
    pub fn drop_index(&self, namespace: &str, name: &str) -> bool {
        let mut state = self.shared.state.write();
        let before = state.indexes.len();
        state
            .indexes
            .retain(|(ns, _, _), index| !(ns == namespace && index.info().name == name));
        before != state.indexes.len()
    }

    /// Removes every record in a set. Indexes stay defined.
    pub fn truncate(&self, namespace: &str, set: &str) {
        let mut state = self.shared.state.write();
        let records = state
            .sets
            .remove(&(namespace.to_string(), set.to_string()))
            .unwrap_or_default();
        for (user_key, record) in records {
            let key = Key::new(namespace, set, user_key);
            state.unindex(&key, &record.bins);
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("config", &self.shared.config)
            .field("active_scans", &self.active_scans())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, key: &Key) -> StoreResult<Option<RawRecord>> {
        self.shared.take_fault()?;
        self.shared.stats.record_get();
        Ok(self.shared.read(key, self.shared.now()))
    }

    async fn get_many(&self, keys: &[Key]) -> StoreResult<Vec<(Key, Option<RawRecord>)>> {
        self.shared.take_fault()?;
        self.shared.stats.record_batch_get();
        let now = self.shared.now();
        Ok(keys
            .iter()
            .map(|key| (key.clone(), self.shared.read(key, now)))
            .collect())
    }

    fn scan(&self, namespace: &str, set: &str, filter: Option<IndexFilter>) -> RecordStream {
        self.shared.stats.record_scan();
        self.shared.active_scans.fetch_add(1, Ordering::SeqCst);
        debug!(namespace, set, ?filter, "memory store scan opened");

        let cursor = ScanCursor {
            shared: Arc::clone(&self.shared),
            namespace: namespace.to_string(),
            set: set.to_string(),
            filter,
            after: None,
            exhausted: false,
        };

        stream::try_unfold(cursor, |cursor| async move { cursor.next_page() })
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<RawRecord, StoreError>)))
            .try_flatten()
            .boxed()
    }

    async fn put(&self, key: &Key, bins: Bins, policy: &WritePolicy) -> StoreResult<u32> {
        self.shared.take_fault()?;
        self.shared.stats.record_put();
        let now = self.shared.now();
        let mut state = self.shared.state.write();

        let set_id = (key.namespace.clone(), key.set.clone());
        let previous = state
            .sets
            .get(&set_id)
            .and_then(|records| records.get(&key.user_key))
            .cloned();
        let live = previous.as_ref().filter(|r| r.is_live(now));

        match (policy.exists, live) {
            (RecordExists::CreateOnly, Some(_)) => {
                return Err(StoreError::KeyExists {
                    key: key.to_string(),
                });
            }
            (RecordExists::UpdateOnly, None) => {
                return Err(StoreError::KeyNotFound {
                    key: key.to_string(),
                });
            }
            _ => {}
        }

        let current = live.map_or(0, |r| r.generation);
        if let Some(expected) = policy.expected_generation {
            if expected != current {
                return Err(StoreError::GenerationMismatch {
                    expected,
                    actual: current,
                });
            }
        }

        if let Some(old) = &previous {
            state.unindex(key, &old.bins);
        }
        state.reindex(key, &bins);

        let generation = current + 1;
        let record = StoredRecord {
            bins,
            generation,
            expires_at: self.shared.expiry(policy.ttl, now),
        };
        state
            .sets
            .entry(set_id)
            .or_default()
            .insert(key.user_key.clone(), record);

        Ok(generation)
    }

    async fn touch(&self, key: &Key, ttl: Ttl) -> StoreResult<Option<RawRecord>> {
        self.shared.take_fault()?;
        self.shared.stats.record_touch();
        let now = self.shared.now();
        let expires_at = self.shared.expiry(ttl, now);
        let mut state = self.shared.state.write();

        let record = state
            .sets
            .get_mut(&(key.namespace.clone(), key.set.clone()))
            .and_then(|records| records.get_mut(&key.user_key))
            .filter(|record| record.is_live(now));

        Ok(record.map(|record| {
            record.generation += 1;
            record.expires_at = expires_at;
            Shared::to_raw(key.clone(), record, now)
        }))
    }

    async fn delete(&self, key: &Key) -> StoreResult<bool> {
        self.shared.take_fault()?;
        self.shared.stats.record_delete();
        let now = self.shared.now();
        let mut state = self.shared.state.write();

        let removed = state
            .sets
            .get_mut(&(key.namespace.clone(), key.set.clone()))
            .and_then(|records| records.remove(&key.user_key));

        match removed {
            Some(record) => {
                state.unindex(key, &record.bins);
                Ok(record.is_live(now))
            }
            None => Ok(false),
        }
    }
}

impl IndexCatalog for MemoryStore {
    fn ensure_index(
        &self,
        namespace: &str,
        set: &str,
        name: &str,
        bin: &str,
        kind: IndexKind,
    ) -> StoreResult<()> {
        let mut state = self.shared.state.write();

        let wanted = IndexInfo {
            name: name.to_string(),
            namespace: namespace.to_string(),
            set: set.to_string(),
            bin: bin.to_string(),
            kind,
        };

        if let Some(existing) = state
            .indexes
            .values()
            .map(SecondaryIndex::info)
            .find(|info| info.namespace == namespace && info.name == name)
        {
            if *existing == wanted {
                debug!(namespace, name, "index already exists");
                return Ok(());
            }
            return Err(StoreError::index_conflict(format!(
                "index {name} already defined on {}.{} ({:?})",
                existing.set, existing.bin, existing.kind
            )));
        }

        let id = (namespace.to_string(), set.to_string(), bin.to_string());
        if let Some(existing) = state.indexes.get(&id) {
            return Err(StoreError::index_conflict(format!(
                "bin {namespace}.{set}.{bin} already indexed by {}",
                existing.info().name
            )));
        }

        let mut index = SecondaryIndex::new(wanted);
        if let Some(records) = state.sets.get(&(namespace.to_string(), set.to_string())) {
            for (user_key, record) in records {
                if let Some(value) = record.bins.get(bin) {
                    index.insert(value, user_key);
                }
            }
        }

        info!(namespace, set, name, bin, ?kind, "created secondary index");
        state.indexes.insert(id, index);
        Ok(())
    }

    fn find_index(&self, namespace: &str, set: &str, bin: &str) -> Option<IndexInfo> {
        let state = self.shared.state.read();
        state
            .indexes
            .get(&(namespace.to_string(), set.to_string(), bin.to_string()))
            .map(|index| index.info().clone())
    }
}

/// Position of a paged scan. Dropping it releases the scan.
struct ScanCursor {
    shared: Arc<Shared>,
    namespace: String,
    set: String,
    filter: Option<IndexFilter>,
    after: Option<Value>,
    exhausted: bool,
}

impl ScanCursor {
    fn next_page(mut self) -> StoreResult<Option<(Vec<RawRecord>, Self)>> {
        if self.exhausted {
            return Ok(None);
        }
        self.shared.take_fault()?;
        self.shared.stats.record_scan_page();

        let page_size = self.shared.config.scan_page_size.max(1);
        let page = self.collect_page(page_size)?;

        if page.len() < page_size {
            self.exhausted = true;
        }
        match page.last() {
            Some(last) => {
                self.after = Some(last.key.user_key.clone());
                Ok(Some((page, self)))
            }
            None => Ok(None),
        }
    }

    fn collect_page(&self, page_size: usize) -> StoreResult<Vec<RawRecord>> {
        let now = self.shared.now();
        let state = self.shared.state.read();
        let empty = BTreeMap::new();
        let records = state
            .sets
            .get(&(self.namespace.clone(), self.set.clone()))
            .unwrap_or(&empty);
        let lower = match &self.after {
            Some(after) => Bound::Excluded(after.clone()),
            None => Bound::Unbounded,
        };
        let key_for = |user_key: &Value| Key::new(&self.namespace, &self.set, user_key.clone());

        let Some(filter) = &self.filter else {
            return Ok(records
                .range((lower, Bound::Unbounded))
                .filter(|(_, record)| record.is_live(now))
                .take(page_size)
                .map(|(user_key, record)| Shared::to_raw(key_for(user_key), record, now))
                .collect());
        };

        let id = (
            self.namespace.clone(),
            self.set.clone(),
            filter.bin().to_string(),
        );
        let index = state.indexes.get(&id).ok_or_else(|| StoreError::IndexNotFound {
            namespace: self.namespace.clone(),
            set: self.set.clone(),
            bin: filter.bin().to_string(),
        })?;
        if !filter.served_by(index.info().kind) {
            return Err(StoreError::invalid_argument(format!(
                "index {} ({:?}) cannot serve {filter:?}",
                index.info().name,
                index.info().kind
            )));
        }

        let candidates = index.lookup(filter);
        Ok(candidates
            .range((lower, Bound::Unbounded))
            .filter_map(|user_key| records.get_key_value(user_key))
            .filter(|(_, record)| {
                record.is_live(now)
                    && record
                        .bins
                        .get(filter.bin())
                        .is_some_and(|value| filter.matches(value))
            })
            .take(page_size)
            .map(|(user_key, record)| Shared::to_raw(key_for(user_key), record, now))
            .collect())
    }
}

impl Drop for ScanCursor {
    fn drop(&mut self) {
        self.shared.active_scans.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bins(pairs: &[(&str, Value)]) -> Bins {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn person_key(id: i64) -> Key {
        Key::new("test", "person", id)
    }

    async fn populate(store: &MemoryStore, count: i64) {
        for id in 0..count {
            store
                .put(
                    &person_key(id),
                    bins(&[("age", Value::from(20 + id))]),
                    &WritePolicy::new(),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn get_absent_is_none() {
        let store = MemoryStore::new();
        assert!(store.get(&person_key(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn generation_counts_writes() {
        let store = MemoryStore::new();
        let key = person_key(1);
        for expected in 1..=3 {
            let generation = store
                .put(&key, bins(&[("v", Value::from(expected))]), &WritePolicy::new())
                .await
                .unwrap();
            assert_eq!(generation, expected as u32);
        }
        let record = store.get(&key).await.unwrap().unwrap();
        assert_eq!(record.generation, 3);
        assert_eq!(record.bin("v"), Some(&Value::from(3)));
    }

    #[tokio::test]
    async fn create_only_rejects_existing() {
        let store = MemoryStore::new();
        let key = person_key(1);
        let policy = WritePolicy::new().exists(RecordExists::CreateOnly);
        store.put(&key, Bins::new(), &policy).await.unwrap();

        let result = store.put(&key, Bins::new(), &policy).await;
        assert!(matches!(result, Err(StoreError::KeyExists { .. })));
    }

    #[tokio::test]
    async fn update_only_rejects_missing() {
        let store = MemoryStore::new();
        let policy = WritePolicy::new().exists(RecordExists::UpdateOnly);
        let result = store.put(&person_key(1), Bins::new(), &policy).await;
        assert!(matches!(result, Err(StoreError::KeyNotFound { .. })));
    }

    #[tokio::test]
    async fn expected_generation_is_checked() {
        let store = MemoryStore::new();
        let key = person_key(1);
        store.put(&key, Bins::new(), &WritePolicy::new()).await.unwrap();
        store.put(&key, Bins::new(), &WritePolicy::new()).await.unwrap();

        let stale = WritePolicy::new().expect_generation(1);
        let result = store.put(&key, Bins::new(), &stale).await;
        assert_eq!(
            result,
            Err(StoreError::GenerationMismatch {
                expected: 1,
                actual: 2
            })
        );

        let fresh = WritePolicy::new().expect_generation(2);
        assert_eq!(store.put(&key, Bins::new(), &fresh).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn touch_bumps_generation_and_ttl() {
        let store = MemoryStore::new();
        let key = person_key(1);
        store.put(&key, Bins::new(), &WritePolicy::new()).await.unwrap();

        let touched = store.touch(&key, Ttl::Seconds(60)).await.unwrap().unwrap();
        assert_eq!(touched.generation, 2);
        assert_eq!(touched.ttl, Some(60));

        assert!(store.touch(&person_key(2), Ttl::Never).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn records_expire_with_the_clock() {
        let store = MemoryStore::new();
        let key = person_key(1);
        let policy = WritePolicy::new().ttl(Ttl::Seconds(10));
        store.put(&key, Bins::new(), &policy).await.unwrap();

        store.advance_clock(Duration::from_secs(5));
        assert!(store.get(&key).await.unwrap().is_some());

        store.advance_clock(Duration::from_secs(6));
        assert!(store.get(&key).await.unwrap().is_none());
        assert_eq!(store.record_count("test", "person"), 0);

        // An expired record is gone: the next write starts over.
        assert_eq!(store.put(&key, Bins::new(), &WritePolicy::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn default_ttl_applies() {
        let store = MemoryStore::with_config(MemoryStoreConfig::new().default_ttl(Some(30)));
        let key = person_key(1);
        store.put(&key, Bins::new(), &WritePolicy::new()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap().ttl, Some(30));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryStore::new();
        let key = person_key(1);
        store.put(&key, Bins::new(), &WritePolicy::new()).await.unwrap();
        assert!(store.delete(&key).await.unwrap());
        assert!(!store.delete(&key).await.unwrap());
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_many_is_positional() {
        let store = MemoryStore::new();
        populate(&store, 2).await;

        let keys = vec![person_key(1), person_key(9), person_key(0)];
        let result = store.get_many(&keys).await.unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].0, person_key(1));
        assert!(result[0].1.is_some());
        assert!(result[1].1.is_none());
        assert!(result[2].1.is_some());
        assert_eq!(store.stats().snapshot().batch_gets, 1);
    }

    #[tokio::test]
    async fn scan_fetches_pages_on_demand() {
        let store = MemoryStore::with_config(MemoryStoreConfig::new().scan_page_size(3));
        populate(&store, 10).await;

        let mut scan = store.scan("test", "person", None);
        assert_eq!(store.stats().snapshot().scan_pages, 0);

        let first = scan.next().await.unwrap().unwrap();
        assert_eq!(first.key, person_key(0));
        assert_eq!(store.stats().snapshot().scan_pages, 1);

        let rest: Vec<_> = scan.try_collect().await.unwrap();
        assert_eq!(rest.len(), 9);
        assert_eq!(store.stats().snapshot().scan_pages, 4);
    }

    #[tokio::test]
    async fn dropping_a_scan_releases_it() {
        let store = MemoryStore::with_config(MemoryStoreConfig::new().scan_page_size(2));
        populate(&store, 10).await;

        let mut scan = store.scan("test", "person", None);
        assert_eq!(store.active_scans(), 1);
        scan.next().await.unwrap().unwrap();
        drop(scan);
        assert_eq!(store.active_scans(), 0);

        let all: Vec<_> = store.scan("test", "person", None).try_collect().await.unwrap();
        assert_eq!(all.len(), 10);
        assert_eq!(store.active_scans(), 0);
    }

    #[tokio::test]
    async fn index_scan_uses_range() {
        let store = MemoryStore::with_config(MemoryStoreConfig::new().scan_page_size(2));
        populate(&store, 10).await;
        store
            .ensure_index("test", "person", "age_index", "age", IndexKind::Numeric)
            .unwrap();

        let hits: Vec<_> = store
            .scan("test", "person", Some(IndexFilter::range("age", 25, 27)))
            .try_collect()
            .await
            .unwrap();
        let ages: Vec<_> = hits.iter().map(|r| r.bin("age").cloned()).collect();
        assert_eq!(
            ages,
            vec![Some(Value::from(25)), Some(Value::from(26)), Some(Value::from(27))]
        );
    }

    #[tokio::test]
    async fn index_follows_updates_and_deletes() {
        let store = MemoryStore::new();
        store
            .ensure_index("test", "person", "age_index", "age", IndexKind::Numeric)
            .unwrap();
        populate(&store, 3).await;

        store
            .put(&person_key(0), bins(&[("age", Value::from(99))]), &WritePolicy::new())
            .await
            .unwrap();
        store.delete(&person_key(1)).await.unwrap();

        let hits: Vec<_> = store
            .scan("test", "person", Some(IndexFilter::range("age", 0, 100)))
            .try_collect()
            .await
            .unwrap();
        let keys: Vec<_> = hits.into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![person_key(0), person_key(2)]);
    }

    #[tokio::test]
    async fn filtered_scan_without_index_fails() {
        let store = MemoryStore::new();
        populate(&store, 1).await;
        let result: StoreResult<Vec<_>> = store
            .scan("test", "person", Some(IndexFilter::equal("age", 20)))
            .try_collect()
            .await;
        assert!(matches!(result, Err(StoreError::IndexNotFound { .. })));
        assert_eq!(store.active_scans(), 0);
    }

    #[test]
    fn ensure_index_is_idempotent() {
        let store = MemoryStore::new();
        store
            .ensure_index("test", "person", "age_index", "age", IndexKind::Numeric)
            .unwrap();
        store
            .ensure_index("test", "person", "age_index", "age", IndexKind::Numeric)
            .unwrap();

        let info = store.find_index("test", "person", "age").unwrap();
        assert_eq!(info.name, "age_index");
        assert!(store.find_index("test", "person", "name").is_none());
    }

    #[test]
    fn conflicting_index_definitions_fail() {
        let store = MemoryStore::new();
        store
            .ensure_index("test", "person", "age_index", "age", IndexKind::Numeric)
            .unwrap();

        let same_name = store.ensure_index("test", "person", "age_index", "name", IndexKind::String);
        assert!(matches!(same_name, Err(StoreError::IndexConflict { .. })));

        let same_bin = store.ensure_index("test", "person", "other", "age", IndexKind::Numeric);
        assert!(matches!(same_bin, Err(StoreError::IndexConflict { .. })));

        assert!(store.drop_index("test", "age_index"));
        assert!(store.find_index("test", "person", "age").is_none());
    }

    #[tokio::test]
    async fn injected_faults_are_consumed_in_order() {
        let store = MemoryStore::new();
        store.fail_next(StoreError::Timeout);

        assert_eq!(store.get(&person_key(1)).await, Err(StoreError::Timeout));
        assert!(store.get(&person_key(1)).await.unwrap().is_none());
        assert_eq!(store.stats().snapshot().errors, 1);
    }

    #[tokio::test]
    async fn truncate_clears_records_and_index_entries() {
        let store = MemoryStore::new();
        store
            .ensure_index("test", "person", "age_index", "age", IndexKind::Numeric)
            .unwrap();
        populate(&store, 4).await;

        store.truncate("test", "person");
        assert_eq!(store.record_count("test", "person"), 0);
        let hits: Vec<_> = store
            .scan("test", "person", Some(IndexFilter::range("age", 0, 100)))
            .try_collect()
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
