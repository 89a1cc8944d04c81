//! Read operations.

use super::{EntityStream, Template};
use crate::entity::EntityCodec;
use crate::error::{CoreError, CoreResult};
use crate::query::{Criterion, DerivedQuery, Query, Sort};
use keyfind_storage::Value;
use tracing::debug;

impl Template {
    /// Finds one entity by id.
    ///
    /// An absent record is `Ok(None)`. For touch-on-read types the record
    /// is rewritten and the returned version is the new generation.
    pub async fn find_by_id<T: EntityCodec>(&self, id: impl Into<Value>) -> CoreResult<Option<T>> {
        let metadata = T::metadata();
        metadata.validate()?;

        let key = self.key(metadata.set, id.into());
        debug!(%key, "find by id");
        match self.store.get(&key).await? {
            Some(record) => self.reconciler.reconcile(record, &metadata).await,
            None => Ok(None),
        }
    }

    /// Finds the entities with the given ids.
    ///
    /// Unknown ids are omitted and repeated ids yield one entity. Entities
    /// come back in the order their ids first appear. An empty id list
    /// makes no store calls.
    pub fn find_by_ids<T, I, V>(&self, ids: I) -> CoreResult<EntityStream<T>>
    where
        T: EntityCodec,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.find(&Query::new().filter(Criterion::id_in(ids)))
    }

    /// Finds every entity of the type, in store order.
    pub fn find_all<T: EntityCodec>(&self) -> CoreResult<EntityStream<T>> {
        self.find(&Query::new())
    }

    /// Finds at most `limit` entities after skipping `offset`.
    ///
    /// With an unsorted `sort` this returns some `limit` entities, whichever
    /// the store yields first. An offset past the end yields nothing.
    pub fn find_in_range<T: EntityCodec>(
        &self,
        offset: u64,
        limit: u64,
        sort: Sort,
    ) -> CoreResult<EntityStream<T>> {
        let metadata = T::metadata();
        let plan = self.resolver.resolve_range(&metadata, offset, limit, sort)?;
        Ok(self.execute(plan, metadata))
    }

    /// Finds the entities matching a query.
    ///
    /// # Errors
    ///
    /// Fails before contacting the store if the query is invalid or the
    /// type's metadata is contradictory.
    pub fn find<T: EntityCodec>(&self, query: &Query) -> CoreResult<EntityStream<T>> {
        let metadata = T::metadata();
        let plan = self.resolver.resolve(query, &metadata)?;
        Ok(self.execute(plan, metadata))
    }

    /// Finds the entities matching a derived finder, such as
    /// `findByLastnameOrderByFirstnameAsc`.
    pub fn find_derived<T: EntityCodec>(
        &self,
        method: &str,
        args: &[Value],
    ) -> CoreResult<EntityStream<T>> {
        let derived = DerivedQuery::parse(method)?;
        if derived.is_count() {
            return Err(CoreError::invalid_query(format!(
                "'{method}' is a count query, use count_derived"
            )));
        }
        self.find(&derived.bind(args)?)
    }

    /// Counts every record of the type.
    pub async fn count<T: EntityCodec>(&self) -> CoreResult<u64> {
        self.count_query::<T>(&Query::new()).await
    }

    /// Counts the records matching a query. Records are not touched.
    pub async fn count_query<T: EntityCodec>(&self, query: &Query) -> CoreResult<u64> {
        let metadata = T::metadata();
        let plan = self.resolver.resolve(query, &metadata)?;
        self.count_plan(plan, metadata.set).await
    }

    /// Counts the records matching a derived finder, such as `countByLastname`.
    pub async fn count_derived<T: EntityCodec>(&self, method: &str, args: &[Value]) -> CoreResult<u64> {
        let query = DerivedQuery::parse(method)?.bind(args)?;
        self.count_query::<T>(&query).await
    }

    /// Returns true if a record with the id exists. Records are not touched.
    pub async fn exists<T: EntityCodec>(&self, id: impl Into<Value>) -> CoreResult<bool> {
        let key = self.key_for::<T>(id);
        Ok(self.store.get(&key).await?.is_some())
    }
}
