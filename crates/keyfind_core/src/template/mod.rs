//! The find/write surface over a store.
//!
//! [`Template`] ties the pieces together: the resolver plans a query, the
//! store adapter fetches raw records, residual criteria and the window are
//! applied while records are still raw, and the reconciler turns the
//! survivors into entities. Touch-on-read therefore only rewrites records
//! that are actually returned.
//!
//! # Invariants
//!
//! - Resolution errors are returned before any store call
//! - Streams are lazy: nothing is fetched until the stream is polled
//! - A store error ends the stream; items already yielded stay valid
//! - Dropping a stream drops the scan and any in-flight store futures

mod find;
mod write;

use crate::config::TemplateConfig;
use crate::entity::{EntityCodec, EntityMetadata};
use crate::error::{CoreError, CoreResult};
use crate::plan::{AccessPath, CriteriaResolver, ExecutionPlan, PlanOrdering, Window};
use crate::reconcile::RecordReconciler;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use keyfind_storage::{IndexCatalog, IndexKind, Key, RawRecord, StoreClient, StoreError, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Lazy sequence of entities produced by a find.
pub type EntityStream<T> = BoxStream<'static, CoreResult<T>>;

type RawStream = BoxStream<'static, CoreResult<RawRecord>>;

/// Entry point for finding and writing entities.
///
/// # Example
///
/// ```rust
/// use futures::TryStreamExt;
/// use keyfind_core::{Template, TemplateConfig};
/// # use keyfind_core::{CoreResult, EntityCodec, EntityMetadata, MappedRecord};
/// # use keyfind_storage::{Bins, Value};
/// use keyfind_storage::MemoryStore;
/// # #[derive(Debug)]
/// # struct Person { id: String }
/// # impl EntityCodec for Person {
/// #     fn metadata() -> EntityMetadata { EntityMetadata::new("person") }
/// #     fn id(&self) -> Value { Value::from(self.id.as_str()) }
/// #     fn encode(&self) -> CoreResult<Bins> { Ok(Bins::new()) }
/// #     fn decode(record: &MappedRecord) -> CoreResult<Self> {
/// #         Ok(Person { id: record.id_text()? })
/// #     }
/// # }
///
/// # futures::executor::block_on(async {
/// let template = Template::with_store(TemplateConfig::default(), MemoryStore::new());
/// template.insert(Person { id: "dave".into() }).await?;
///
/// let found: Option<Person> = template.find_by_id("dave").await?;
/// assert!(found.is_some());
///
/// let everyone: Vec<Person> = template.find_all()?.try_collect().await?;
/// assert_eq!(everyone.len(), 1);
/// # Ok::<(), keyfind_core::CoreError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct Template {
    config: TemplateConfig,
    store: Arc<dyn StoreClient>,
    catalog: Arc<dyn IndexCatalog>,
    resolver: CriteriaResolver,
    reconciler: RecordReconciler,
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Template {
    /// Creates a template over a store client and an index catalog.
    pub fn new(
        config: TemplateConfig,
        store: Arc<dyn StoreClient>,
        catalog: Arc<dyn IndexCatalog>,
    ) -> Self {
        let resolver = CriteriaResolver::new(
            config.namespace.clone(),
            Arc::clone(&catalog),
            config.scan_warnings,
        );
        let reconciler = RecordReconciler::new(Arc::clone(&store));
        Self {
            config,
            store,
            catalog,
            resolver,
            reconciler,
        }
    }

    /// Creates a template over a store that is also its own index catalog.
    pub fn with_store<S>(config: TemplateConfig, store: S) -> Self
    where
        S: StoreClient + IndexCatalog + 'static,
    {
        let store = Arc::new(store);
        Self::new(config, store.clone(), store)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Returns the resolver, for inspecting plans.
    pub fn resolver(&self) -> &CriteriaResolver {
        &self.resolver
    }

    /// Builds the store key of an entity of type `T`.
    pub fn key_for<T: EntityCodec>(&self, id: impl Into<Value>) -> Key {
        self.key(T::metadata().set, id.into())
    }

    /// Creates a secondary index on a bin of `T`'s set unless it exists.
    pub fn ensure_index<T: EntityCodec>(
        &self,
        name: &str,
        bin: &str,
        kind: IndexKind,
    ) -> CoreResult<()> {
        let set = T::metadata().set;
        self.catalog
            .ensure_index(&self.config.namespace, set, name, bin, kind)?;
        info!(set, name, bin, ?kind, "index ready");
        Ok(())
    }

    fn key(&self, set: &str, id: Value) -> Key {
        Key::new(self.config.namespace.as_str(), set, id)
    }

    /// Runs a plan and reconciles the surviving records.
    fn execute<T: EntityCodec>(&self, plan: ExecutionPlan, metadata: EntityMetadata) -> EntityStream<T> {
        let reconciler = self.reconciler.clone();
        let entities = self
            .records(plan, metadata.set)
            .map(move |item| {
                let reconciler = reconciler.clone();
                async move {
                    match item {
                        Ok(record) => reconciler.reconcile::<T>(record, &metadata).await,
                        Err(err) => Err(err),
                    }
                }
            })
            .buffered(self.config.effective_concurrency())
            .filter_map(|result| future::ready(result.transpose()))
            .boxed();
        stop_after_error(entities)
    }

    /// Counts the records a plan matches without reconciling them.
    async fn count_plan(&self, plan: ExecutionPlan, set: &str) -> CoreResult<u64> {
        self.records(plan, set)
            .try_fold(0u64, |count, _| future::ready(Ok::<u64, CoreError>(count + 1)))
            .await
    }

    /// Fetches, filters, orders and windows raw records.
    fn records(&self, plan: ExecutionPlan, set: &str) -> RawStream {
        let ExecutionPlan {
            access,
            residual,
            ordering,
            window,
        } = plan;

        let fetched = self.fetch(access, set);
        let filtered = if residual.is_empty() {
            fetched
        } else {
            fetched
                .try_filter(move |record| {
                    future::ready(
                        residual
                            .iter()
                            .all(|criterion| criterion.matches(&record.key.user_key, &record.bins)),
                    )
                })
                .boxed()
        };

        let ordered = match ordering {
            PlanOrdering::Unordered => filtered,
            PlanOrdering::ClientSide(sort) => stream::once(async move {
                let mut records: Vec<RawRecord> = filtered.try_collect().await?;
                records.sort_by(|a, b| sort.compare(&a.bins, &b.bins));
                Ok::<_, CoreError>(stream::iter(
                    records.into_iter().map(Ok::<RawRecord, CoreError>),
                ))
            })
            .try_flatten()
            .boxed(),
        };

        stop_after_error(apply_window(ordered, window))
    }

    fn fetch(&self, access: AccessPath, set: &str) -> RawStream {
        let namespace = self.config.namespace.as_str();
        match access {
            AccessPath::ByKey(id) => {
                let store = Arc::clone(&self.store);
                let key = self.key(set, id);
                debug!(%key, "point read");
                stream::once(async move { store.get(&key).await })
                    .map_err(CoreError::from)
                    .try_filter_map(|record| future::ready(Ok::<_, CoreError>(record)))
                    .boxed()
            }
            AccessPath::ByKeys(ids) => self.batch_records(set, ids),
            AccessPath::FullScan => {
                debug!(namespace, set, "full scan");
                self.store.scan(namespace, set, None).map_err(CoreError::from).boxed()
            }
            AccessPath::IndexScan(filter) => {
                debug!(namespace, set, ?filter, "index scan");
                self.store
                    .scan(namespace, set, Some(filter))
                    .map_err(CoreError::from)
                    .boxed()
            }
        }
    }

    /// Reads keys in batches, keeping request order across batches.
    fn batch_records(&self, set: &str, ids: Vec<Value>) -> RawStream {
        let keys: Vec<Key> = ids.into_iter().map(|id| self.key(set, id)).collect();
        let batches: Vec<Vec<Key>> = keys
            .chunks(self.config.effective_batch_size())
            .map(<[Key]>::to_vec)
            .collect();
        debug!(set, keys = keys.len(), batches = batches.len(), "batch read");

        let store = Arc::clone(&self.store);
        stream::iter(batches)
            .map(move |batch| {
                let store = Arc::clone(&store);
                async move { store.get_many(&batch).await }
            })
            .buffered(self.config.effective_concurrency())
            .map_ok(|found| {
                stream::iter(
                    found
                        .into_iter()
                        .filter_map(|(_, record)| record)
                        .map(Ok::<RawRecord, StoreError>),
                )
            })
            .try_flatten()
            .map_err(CoreError::from)
            .boxed()
    }
}

/// Skips `offset` records, then passes at most `limit`. Errors pass through.
fn apply_window(records: RawStream, window: Window) -> RawStream {
    if window.is_unbounded() {
        return records;
    }

    let offset = window.offset;
    let mut skipped = 0u64;
    let windowed = records.try_filter(move |_| {
        let keep = skipped >= offset;
        if !keep {
            skipped += 1;
        }
        future::ready(keep)
    });

    match window.limit {
        Some(limit) => windowed
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .boxed(),
        None => windowed.boxed(),
    }
}

/// Ends a stream right after its first error.
fn stop_after_error<T: Send + 'static>(
    items: BoxStream<'static, CoreResult<T>>,
) -> BoxStream<'static, CoreResult<T>> {
    items
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}
