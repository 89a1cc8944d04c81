//! Write operations.
//!
//! Every successful write stamps the generation the store returns into the
//! entity's version, so a written entity can be updated again without a
//! re-read.

use super::Template;
use crate::entity::{EntityCodec, EntityMetadata};
use crate::error::{CoreError, CoreResult};
use futures::TryStreamExt;
use keyfind_storage::{Key, RecordExists, StoreError, Value, WritePolicy};
use tracing::{debug, info};

impl Template {
    /// Inserts a new entity.
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateKey`] if a record with the same id exists.
    pub async fn insert<T: EntityCodec>(&self, mut entity: T) -> CoreResult<T> {
        let metadata = T::metadata();
        let key = self.key(metadata.set, entity.id());
        let policy = WritePolicy::new()
            .exists(RecordExists::CreateOnly)
            .ttl(metadata.write_ttl(entity.expiration()));

        let generation = self
            .store
            .put(&key, entity.encode()?, &policy)
            .await
            .map_err(|err| match err {
                StoreError::KeyExists { .. } => CoreError::DuplicateKey {
                    key: key.to_string(),
                },
                other => other.into(),
            })?;

        stamp(&mut entity, &metadata, generation);
        debug!(%key, generation, "inserted");
        Ok(entity)
    }

    /// Inserts several entities in order, stopping at the first failure.
    pub async fn insert_all<T: EntityCodec>(&self, entities: Vec<T>) -> CoreResult<Vec<T>> {
        let mut inserted = Vec::with_capacity(entities.len());
        for entity in entities {
            inserted.push(self.insert(entity).await?);
        }
        Ok(inserted)
    }

    /// Creates or replaces an entity.
    ///
    /// Versioned entities with a version are only written if the stored
    /// generation still equals that version. Versioned entities without one
    /// are created, failing if someone else created the record first.
    ///
    /// # Errors
    ///
    /// [`CoreError::OptimisticLockingFailure`] if a versioned write loses a
    /// race.
    pub async fn save<T: EntityCodec>(&self, mut entity: T) -> CoreResult<T> {
        let metadata = T::metadata();
        let key = self.key(metadata.set, entity.id());
        let expected = expected_version(&entity, &metadata);
        let policy = match (metadata.versioned, expected) {
            (true, Some(version)) => WritePolicy::new()
                .exists(RecordExists::UpdateOnly)
                .expect_generation(version),
            (true, None) => WritePolicy::new().exists(RecordExists::CreateOnly),
            (false, _) => WritePolicy::new(),
        }
        .ttl(metadata.write_ttl(entity.expiration()));

        let generation = self
            .store
            .put(&key, entity.encode()?, &policy)
            .await
            .map_err(|err| match err {
                StoreError::KeyExists { .. }
                | StoreError::KeyNotFound { .. }
                | StoreError::GenerationMismatch { .. }
                    if metadata.versioned =>
                {
                    optimistic_failure(&key, expected)
                }
                other => other.into(),
            })?;

        stamp(&mut entity, &metadata, generation);
        debug!(%key, generation, "saved");
        Ok(entity)
    }

    /// Replaces an existing entity.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EntityNotFound`] if there is no record to update
    /// - [`CoreError::OptimisticLockingFailure`] if the entity carries a
    ///   version and the stored generation differs
    pub async fn update<T: EntityCodec>(&self, mut entity: T) -> CoreResult<T> {
        let metadata = T::metadata();
        let key = self.key(metadata.set, entity.id());
        let expected = expected_version(&entity, &metadata);
        let mut policy = WritePolicy::new()
            .exists(RecordExists::UpdateOnly)
            .ttl(metadata.write_ttl(entity.expiration()));
        if let Some(version) = expected {
            policy = policy.expect_generation(version);
        }

        let generation = self
            .store
            .put(&key, entity.encode()?, &policy)
            .await
            .map_err(|err| match err {
                StoreError::KeyNotFound { .. } => CoreError::EntityNotFound {
                    key: key.to_string(),
                },
                StoreError::GenerationMismatch { .. } => optimistic_failure(&key, expected),
                other => other.into(),
            })?;

        stamp(&mut entity, &metadata, generation);
        debug!(%key, generation, "updated");
        Ok(entity)
    }

    /// Deletes by id. Returns true if a record was deleted.
    pub async fn delete_by_id<T: EntityCodec>(&self, id: impl Into<Value>) -> CoreResult<bool> {
        let key = self.key_for::<T>(id);
        let existed = self.store.delete(&key).await?;
        debug!(%key, existed, "deleted");
        Ok(existed)
    }

    /// Deletes an entity. Returns true if a record was deleted.
    pub async fn delete<T: EntityCodec>(&self, entity: &T) -> CoreResult<bool> {
        self.delete_by_id::<T>(entity.id()).await
    }

    /// Deletes every record of the type. Returns how many were deleted.
    pub async fn delete_all<T: EntityCodec>(&self) -> CoreResult<u64> {
        let set = T::metadata().set;
        let keys: Vec<Key> = self
            .store
            .scan(&self.config.namespace, set, None)
            .map_ok(|record| record.key)
            .try_collect()
            .await?;

        let mut deleted = 0;
        for key in keys {
            if self.store.delete(&key).await? {
                deleted += 1;
            }
        }
        if deleted > 0 {
            info!(set, deleted, "deleted all records");
        }
        Ok(deleted)
    }
}

/// Version a write is conditioned on: a positive version of a versioned type.
fn expected_version<T: EntityCodec>(entity: &T, metadata: &EntityMetadata) -> Option<u32> {
    if metadata.versioned {
        entity.version().filter(|version| *version > 0)
    } else {
        None
    }
}

fn stamp<T: EntityCodec>(entity: &mut T, metadata: &EntityMetadata, generation: u32) {
    if metadata.versioned {
        entity.set_version(generation);
    }
}

fn optimistic_failure(key: &Key, expected: Option<u32>) -> CoreError {
    CoreError::OptimisticLockingFailure {
        key: key.to_string(),
        expected,
    }
}
