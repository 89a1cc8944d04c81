//! # keyfind Storage
//!
//! Store client abstraction and an in-memory reference store for keyfind.
//!
//! This crate is the lowest layer of keyfind. A store holds **records**:
//! named bins of [`Value`]s addressed by a [`Key`], each carrying a
//! store-assigned generation and a TTL. Stores know nothing about entity
//! types, queries or versions.
//!
//! ## Design Principles
//!
//! - Clients are asynchronous and `Send + Sync`
//! - An absent record is `None`, never a default-valued record
//! - Generations are owned by the store; callers only observe them
//! - Scans are lazy streams and stop working when dropped
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and embedding
//!
//! ## Example
//!
//! ```rust
//! use keyfind_storage::{IndexCatalog, IndexFilter, IndexKind, Key, MemoryStore, StoreClient, Value, WritePolicy};
//! use futures::TryStreamExt;
//! use std::collections::BTreeMap;
//!
//! # futures::executor::block_on(async {
//! let store = MemoryStore::new();
//! store.ensure_index("test", "person", "age_index", "age", IndexKind::Numeric).unwrap();
//!
//! for age in 20..30 {
//!     let mut bins = BTreeMap::new();
//!     bins.insert("age".to_string(), Value::from(age));
//!     store.put(&Key::new("test", "person", age), bins, &WritePolicy::new()).await.unwrap();
//! }
//!
//! let adults: Vec<_> = store
//!     .scan("test", "person", Some(IndexFilter::range("age", 25, 29)))
//!     .try_collect()
//!     .await
//!     .unwrap();
//! assert_eq!(adults.len(), 5);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod filter;
mod index;
mod memory;
mod record;
mod stats;
mod value;

pub use backend::{IndexCatalog, RecordStream, StoreClient};
pub use error::{StoreError, StoreResult};
pub use filter::{IndexFilter, IndexInfo, IndexKind};
pub use memory::{MemoryStore, MemoryStoreConfig};
pub use record::{Bins, Key, RawRecord, RecordExists, Ttl, WritePolicy};
pub use stats::{StatsSnapshot, StoreStats};
pub use value::Value;
