//! Entity metadata and codecs.
//!
//! An entity type describes itself through [`EntityCodec`]: how it maps to
//! and from bins, where its identity and version live, and the static
//! [`EntityMetadata`] that drives versioning, expiration and touch-on-read.

mod codec;
mod metadata;

pub use codec::{EntityCodec, MappedRecord};
pub use metadata::{EntityMetadata, ExpirationPolicy};
