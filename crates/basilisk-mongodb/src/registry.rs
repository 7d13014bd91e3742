//! Registry of cached database and collection handles
//!
//! A [`Registry`] owns a `name -> Database` cache; each [`Database`] owns a
//! lazily filled `name -> Collection` cache. Handles are never evicted or
//! refreshed. Both caches are guarded by `RwLock`s so first access from
//! concurrent tasks creates exactly one handle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::collection::Collection;
use crate::connection::{DatabaseOption, MongoConnector, PoolConfig};
use crate::driver::{Connector, StoreDatabase};
use crate::{BasiliskError, Result};

/// Caller-owned cache of database handles.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use basilisk_mongodb::{DatabaseOption, Registry};
///
/// let registry = Registry::new();
/// let db = registry
///     .new_database(
///         "mongodb://localhost:27017",
///         "shop",
///         &[
///             DatabaseOption::MaxPoolSize(10),
///             DatabaseOption::MaxConnIdleTime(Duration::from_secs(5)),
///         ],
///     )
///     .await?;
/// let orders = db.get_collection("orders")?;
/// ```
pub struct Registry {
    connector: Arc<dyn Connector>,
    databases: RwLock<HashMap<String, Database>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("databases", &self.database_names())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry that connects through the MongoDB driver
    pub fn new() -> Self {
        Self::with_connector(Arc::new(MongoConnector::new()))
    }

    /// Create an empty registry on top of a custom driver
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            databases: RwLock::new(HashMap::new()),
        }
    }

    /// Connect to `address`, verify the primary answers, and cache the
    /// resulting handle under `name`.
    ///
    /// `options` are applied in order to a fresh [`PoolConfig`]. The connect
    /// step and the liveness ping each get their own deadline. A handle
    /// already cached under `name` is replaced, not closed.
    ///
    /// # Errors
    /// - `ConnectTimeout` if connecting exceeds the connect deadline
    /// - `Connection` if the driver cannot connect
    /// - `Unreachable` if the ping fails or exceeds the ping deadline
    ///
    /// Nothing is cached on failure.
    #[instrument(skip_all, fields(database = %name))]
    pub async fn new_database(
        &self,
        address: &str,
        name: &str,
        options: &[DatabaseOption],
    ) -> Result<Database> {
        let config = PoolConfig::from_options(options);

        let client = timeout(config.connect_timeout, self.connector.connect(address, &config))
            .await
            .map_err(|_| {
                BasiliskError::ConnectTimeout(format!(
                    "No connection established within {:?}",
                    config.connect_timeout
                ))
            })??;

        match timeout(config.ping_timeout, client.ping_primary()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BasiliskError::Unreachable(e.into_message())),
            Err(_) => {
                return Err(BasiliskError::Unreachable(format!(
                    "Ping did not complete within {:?}",
                    config.ping_timeout
                )))
            }
        }

        let database = Database::new(name, client.database(name));
        self.databases
            .write()
            .insert(name.to_string(), database.clone());

        info!(
            max_pool_size = ?config.max_pool_size,
            min_pool_size = ?config.min_pool_size,
            "Database registered"
        );
        Ok(database)
    }

    /// Look up a cached database handle
    pub fn database(&self, name: &str) -> Option<Database> {
        self.databases.read().get(name).cloned()
    }

    /// Names of all cached databases, sorted
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// A connected database with its collection cache.
///
/// Cloning is cheap; clones share the cache.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    name: String,
    store: Arc<dyn StoreDatabase>,
    collections: RwLock<HashMap<String, Collection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.name)
            .field("collections", &self.collection_names())
            .finish()
    }
}

impl Database {
    fn new(name: &str, store: Arc<dyn StoreDatabase>) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                name: name.to_string(),
                store,
                collections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Get the name the database was registered under
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get a collection handle, creating and caching it on first access.
    ///
    /// # Errors
    /// `NotFound` if the store refuses to create a handle for `name`.
    pub fn get_collection(&self, name: &str) -> Result<Collection> {
        if let Some(collection) = self.inner.collections.read().get(name) {
            return Ok(collection.clone());
        }

        let mut collections = self.inner.collections.write();
        // Another caller may have won the race between the two locks
        if let Some(collection) = collections.get(name) {
            return Ok(collection.clone());
        }

        let store = self.inner.store.collection(name).ok_or_else(|| {
            BasiliskError::NotFound(format!(
                "Collection '{}' could not be created in database '{}'",
                name, self.inner.name
            ))
        })?;

        let collection = Collection::new(store);
        collections.insert(name.to_string(), collection.clone());
        debug!(database = %self.inner.name, collection = name, "Collection handle created");

        Ok(collection)
    }

    /// Names of all cached collections, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns true if both handles share the same collection cache.
    pub fn same_handle(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
