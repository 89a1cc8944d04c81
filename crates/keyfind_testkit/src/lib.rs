//! # keyfind testkit
//!
//! Test utilities for keyfind.
//!
//! This crate provides:
//! - Fixture entity types covering every metadata combination
//! - [`TestTemplate`], a template over a fresh in-memory store
//! - Property-based test generators using proptest
//! - One-time tracing setup for test runs
//!
//! ## Usage
//!
//! ```rust
//! use futures::TryStreamExt;
//! use keyfind_testkit::prelude::*;
//!
//! # futures::executor::block_on(async {
//! let template = TestTemplate::with_person_indexes();
//! template.insert_all(Person::family("Matthews", 3)).await.unwrap();
//!
//! let found: Vec<Person> = template
//!     .find_derived("findByLastname", &[Value::from("Matthews")])
//!     .unwrap()
//!     .try_collect()
//!     .await
//!     .unwrap();
//! assert_eq!(found.len(), 3);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use keyfind_core::{
        CoreError, Criterion, EntityCodec, Query, Sort, Template, TemplateConfig, Value,
    };
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
