//! # keyfind core
//!
//! Find/query execution engine over a key/value store with secondary
//! indexes.
//!
//! This crate provides:
//! - Entity metadata and the [`EntityCodec`] mapping trait
//! - Logical queries ([`Query`], [`Criterion`], [`Sort`]) and derived
//!   finder names ([`DerivedQuery`])
//! - The [`CriteriaResolver`], which picks a point lookup, batch lookup,
//!   index scan or full scan for each query
//! - The [`RecordReconciler`], which maps record generations to entity
//!   versions and implements touch-on-read
//! - [`Template`], the find and write surface
//!
//! ## Design Principles
//!
//! - **Validate first**: invalid queries and contradictory metadata fail
//!   before the store is contacted
//! - **Lazy results**: finds return streams; nothing is fetched until polled
//! - **Generations are versions**: the engine never caches a version, it
//!   reports what the store last returned
//! - **Reads may write**: touch-on-read types advance their version on
//!   every read, so such reads are not idempotent
//!
//! ## Example
//!
//! ```rust
//! use futures::TryStreamExt;
//! use keyfind_core::{Criterion, Query, Sort, Template, TemplateConfig};
//! # use keyfind_core::{CoreResult, EntityCodec, EntityMetadata, MappedRecord};
//! use keyfind_storage::{Bins, IndexKind, MemoryStore, Value};
//! # #[derive(Debug)]
//! # struct Person { id: String, age: i64 }
//! # impl EntityCodec for Person {
//! #     fn metadata() -> EntityMetadata { EntityMetadata::new("person") }
//! #     fn id(&self) -> Value { Value::from(self.id.as_str()) }
//! #     fn encode(&self) -> CoreResult<Bins> {
//! #         let mut bins = Bins::new();
//! #         bins.insert("age".into(), Value::from(self.age));
//! #         Ok(bins)
//! #     }
//! #     fn decode(record: &MappedRecord) -> CoreResult<Self> {
//! #         Ok(Person { id: record.id_text()?, age: record.integer("age")? })
//! #     }
//! # }
//!
//! # futures::executor::block_on(async {
//! let template = Template::with_store(TemplateConfig::default(), MemoryStore::new());
//! template.ensure_index::<Person>("age_index", "age", IndexKind::Numeric)?;
//! for age in 21..=30 {
//!     template.insert(Person { id: format!("p{age}"), age }).await?;
//! }
//!
//! let query = Query::new()
//!     .filter(Criterion::between("age", 25, 30))
//!     .sort(Sort::asc("age"));
//! let found: Vec<Person> = template.find(&query)?.try_collect().await?;
//! assert_eq!(found.len(), 6);
//! assert_eq!(found[0].age, 25);
//! # Ok::<(), keyfind_core::CoreError>(())
//! # }).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entity;
mod error;
mod plan;
pub mod query;
mod reconcile;
mod template;

pub use config::TemplateConfig;
pub use entity::{EntityCodec, EntityMetadata, ExpirationPolicy, MappedRecord};
pub use error::{CoreError, CoreResult, UNSORTED_OFFSET_MESSAGE};
pub use plan::{AccessPath, CriteriaResolver, ExecutionPlan, PlanOrdering, Window};
pub use query::{Condition, Criterion, DerivedQuery, Direction, Order, Query, Sort};
pub use reconcile::RecordReconciler;
pub use template::{EntityStream, Template};

// Re-export the store-facing types entity codecs are written against.
pub use keyfind_storage::{Bins, Value};
