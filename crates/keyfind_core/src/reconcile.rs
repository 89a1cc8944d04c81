//! Record reconciliation: raw records into entities.
//!
//! The reconciler is the only place a record generation becomes an entity
//! version, and the only place reads write.

use crate::entity::{EntityCodec, EntityMetadata, MappedRecord};
use crate::error::CoreResult;
use keyfind_storage::{RawRecord, StoreClient};
use std::sync::Arc;
use tracing::{debug, trace};

/// Converts raw records into entities, applying touch-on-read.
#[derive(Clone)]
pub struct RecordReconciler {
    store: Arc<dyn StoreClient>,
}

impl std::fmt::Debug for RecordReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReconciler").finish_non_exhaustive()
    }
}

impl RecordReconciler {
    /// Creates a reconciler that touches through `store`.
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self { store }
    }

    /// Reconciles one record according to the type's metadata.
    ///
    /// Returns `Ok(None)` only for touch-on-read types whose record vanished
    /// between the read and the touch.
    pub async fn reconcile<T: EntityCodec>(
        &self,
        record: RawRecord,
        metadata: &EntityMetadata,
    ) -> CoreResult<Option<T>> {
        if metadata.touch_on_read {
            self.read_and_advance(record, metadata).await
        } else {
            Self::read(record, metadata).map(Some)
        }
    }

    /// Decodes a record, exposing its generation as the version.
    pub fn read<T: EntityCodec>(record: RawRecord, metadata: &EntityMetadata) -> CoreResult<T> {
        let mapped = MappedRecord::from(record);
        let mut entity = T::decode(&mapped)?;
        if metadata.versioned {
            entity.set_version(mapped.version);
        }
        Ok(entity)
    }

    /// Rewrites the record's expiration, then decodes the rewritten record.
    ///
    /// The version reported is the generation produced by the rewrite, so
    /// every read of a touch-on-read type observes a new version.
    pub async fn read_and_advance<T: EntityCodec>(
        &self,
        record: RawRecord,
        metadata: &EntityMetadata,
    ) -> CoreResult<Option<T>> {
        let observed = record.generation;
        let touched = self.store.touch(&record.key, metadata.touch_ttl()).await?;
        match touched {
            Some(touched) => {
                trace!(key = %touched.key, observed, generation = touched.generation, "touched on read");
                Self::read(touched, metadata).map(Some)
            }
            None => {
                debug!(key = %record.key, "record deleted before touch-on-read");
                Ok(None)
            }
        }
    }
}
