//! Boundary with the underlying document-store driver
//!
//! The registry and the write operations only talk to the store through these
//! traits. [`crate::MongoConnector`] implements them on the official MongoDB
//! driver; tests plug in an in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument};
use mongodb::options::UpdateOptions;

use crate::{PoolConfig, Result};

/// Opens driver connections for a URI-style address.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection pool for `address` configured by `config`.
    async fn connect(&self, address: &str, config: &PoolConfig) -> Result<Arc<dyn StoreClient>>;
}

/// A live connection pool to one deployment.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Round-trip a ping against the primary.
    async fn ping_primary(&self) -> Result<()>;

    fn database(&self, name: &str) -> Arc<dyn StoreDatabase>;
}

pub trait StoreDatabase: Send + Sync {
    fn name(&self) -> &str;

    /// Acquire a collection handle. `None` means the store refuses to create
    /// a handle for `name`.
    fn collection(&self, name: &str) -> Option<Arc<dyn StoreCollection>>;
}

#[async_trait]
pub trait StoreCollection: Send + Sync {
    fn name(&self) -> &str;

    /// Insert one document, returning the identifier the store assigned.
    async fn insert_one(&self, document: BsonDocument) -> Result<Bson>;

    /// Apply `update` to the first document matching `filter`.
    async fn update_one(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome>;
}

/// Result of a single-document update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Number of documents matched by the filter
    pub matched_count: u64,
    /// Number of documents actually modified
    pub modified_count: u64,
    /// Identifier of the upserted document, if the update inserted one
    pub upserted_id: Option<Bson>,
}

impl From<mongodb::results::UpdateResult> for UpdateOutcome {
    fn from(result: mongodb::results::UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        }
    }
}
