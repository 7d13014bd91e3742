//! MongoDB connection management with pool configuration and health checking

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Bson, Document as BsonDocument};
use mongodb::{
    options::{ClientOptions, ReadPreference, SelectionCriteria, UpdateOptions},
    Client, Collection, Database,
};
use tracing::warn;

use crate::driver::{Connector, StoreClient, StoreCollection, StoreDatabase, UpdateOutcome};
use crate::validation::validate_collection_name;
use crate::{BasiliskError, Result};

/// Deadline for establishing the initial connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline for the liveness ping that follows a successful connect
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Minimum number of connections in the pool (default: driver default)
    pub min_pool_size: Option<u32>,
    /// Maximum number of connections in the pool (default: driver default)
    pub max_pool_size: Option<u32>,
    /// Maximum time a connection can remain idle before being closed (default: none)
    pub max_idle_time: Option<Duration>,
    /// Connection timeout (default: 15s)
    pub connect_timeout: Duration,
    /// Liveness ping timeout (default: 5s)
    pub ping_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: None,
            max_pool_size: None,
            max_idle_time: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }
}

impl PoolConfig {
    /// Build a config by applying `options` in order to the defaults.
    pub fn from_options(options: &[DatabaseOption]) -> Self {
        let mut config = Self::default();
        for option in options.iter().copied() {
            option.apply(&mut config);
        }
        config
    }

    /// Copy the configured settings onto driver options.
    pub fn apply_to(&self, client_options: &mut ClientOptions) {
        if let Some(min) = self.min_pool_size {
            client_options.min_pool_size = Some(min);
        }
        if let Some(max) = self.max_pool_size {
            client_options.max_pool_size = Some(max);
        }
        if let Some(idle) = self.max_idle_time {
            client_options.max_idle_time = Some(idle);
        }
        client_options.connect_timeout = Some(self.connect_timeout);
        client_options.server_selection_timeout = Some(self.ping_timeout);
    }
}

/// A single setting applied to a database's pool before connecting.
///
/// Options are applied in order, so a later option overrides an earlier one
/// of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseOption {
    MaxPoolSize(u32),
    MinPoolSize(u32),
    MaxConnIdleTime(Duration),
    /// Override the connect deadline
    ConnectTimeout(Duration),
    /// Override the liveness ping deadline
    PingTimeout(Duration),
}

impl DatabaseOption {
    pub fn apply(self, config: &mut PoolConfig) {
        match self {
            DatabaseOption::MaxPoolSize(size) => config.max_pool_size = Some(size),
            DatabaseOption::MinPoolSize(size) => config.min_pool_size = Some(size),
            DatabaseOption::MaxConnIdleTime(idle) => config.max_idle_time = Some(idle),
            DatabaseOption::ConnectTimeout(timeout) => config.connect_timeout = timeout,
            DatabaseOption::PingTimeout(timeout) => config.ping_timeout = timeout,
        }
    }
}

/// [`Connector`] backed by the official MongoDB driver
#[derive(Debug, Clone, Default)]
pub struct MongoConnector;

impl MongoConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(&self, address: &str, config: &PoolConfig) -> Result<Arc<dyn StoreClient>> {
        let mut client_options = ClientOptions::parse(address)
            .await
            .map_err(|e| BasiliskError::Connection(format!("Invalid connection string: {}", e)))?;

        config.apply_to(&mut client_options);

        let client = Client::with_options(client_options)
            .map_err(|e| BasiliskError::Connection(e.to_string()))?;

        Ok(Arc::new(MongoClient { client }))
    }
}

struct MongoClient {
    client: Client,
}

#[async_trait]
impl StoreClient for MongoClient {
    async fn ping_primary(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .selection_criteria(SelectionCriteria::ReadPreference(ReadPreference::Primary))
            .await
            .map_err(|e| BasiliskError::Unreachable(format!("Ping failed: {}", e)))?;
        Ok(())
    }

    fn database(&self, name: &str) -> Arc<dyn StoreDatabase> {
        Arc::new(MongoDatabase {
            database: self.client.database(name),
        })
    }
}

struct MongoDatabase {
    database: Database,
}

impl StoreDatabase for MongoDatabase {
    fn name(&self) -> &str {
        self.database.name()
    }

    fn collection(&self, name: &str) -> Option<Arc<dyn StoreCollection>> {
        if let Err(e) = validate_collection_name(self.database.name(), name) {
            warn!(collection = name, error = %e, "Refusing collection handle");
            return None;
        }
        Some(Arc::new(MongoCollection {
            collection: self.database.collection(name),
        }))
    }
}

struct MongoCollection {
    collection: Collection<BsonDocument>,
}

#[async_trait]
impl StoreCollection for MongoCollection {
    fn name(&self) -> &str {
        self.collection.name()
    }

    async fn insert_one(&self, document: BsonDocument) -> Result<Bson> {
        let result = self.collection.insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn update_one(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome> {
        let result = self
            .collection
            .update_one(filter, update)
            .with_options(options)
            .await?;
        Ok(result.into())
    }
}
