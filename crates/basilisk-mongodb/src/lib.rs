//! MongoDB client layer for basilisk
//!
//! This crate caches database and collection handles per registry and turns
//! partially populated documents into minimal `$set` updates.
//!
//! # Features
//! - Registry of database handles keyed by name, each with a lazily filled
//!   collection cache
//! - Bounded connect and liveness-ping deadlines on startup
//! - Path flattening of nested records and sequences into dotted `$set` keys,
//!   with `$` positional markers for array elements
//! - A driver seam so the registry runs against any store implementation
//!
//! # Zero values are "unset"
//!
//! Flattening skips every leaf that holds its type's zero value (`""`, `0`,
//! `false`, null, ...). A field can therefore never be explicitly set to zero
//! through [`Collection::update_one`]; issue a raw driver update for that.

pub mod collection;
pub mod connection;
pub mod driver;
pub mod flatten;
pub mod registry;
mod shape;
pub mod validation;

pub use basilisk_common::{BasiliskError, Result};
pub use collection::Collection;
pub use connection::{DatabaseOption, MongoConnector, PoolConfig};
pub use driver::{Connector, StoreClient, StoreCollection, StoreDatabase, UpdateOutcome};
pub use flatten::{flatten, flatten_document, is_zero, PathValueMap, UpdateRecord, UpdateValue};
pub use registry::{Database, Registry};
pub use validation::validate_collection_name;
