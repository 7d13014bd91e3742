//! In-memory store used by the integration tests.
//!
//! Every connect, collection creation, insert and update is recorded so tests
//! can assert on exactly what reached the driver.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use basilisk_mongodb::{
    BasiliskError, Connector, PoolConfig, Result, StoreClient, StoreCollection, StoreDatabase,
    UpdateOutcome,
};
use bson::{oid::ObjectId, Bson, Document as BsonDocument};
use mongodb::options::UpdateOptions;
use parking_lot::Mutex;

/// How the next connect/ping behaves
#[derive(Debug, Clone, Default)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail(String),
    /// Fail with this exact error instead of the step's own variant
    Raise(BasiliskError),
    Hang,
}

/// A write that reached the store
#[derive(Debug, Clone)]
pub enum Call {
    Insert {
        address: String,
        collection: String,
        document: BsonDocument,
    },
    Update {
        address: String,
        collection: String,
        filter: BsonDocument,
        update: BsonDocument,
        upsert: Option<bool>,
    },
}

#[derive(Default)]
struct State {
    connect: Behavior,
    ping: Behavior,
    configs: Vec<(String, PoolConfig)>,
    rejected_collections: Vec<String>,
    store_error: Option<String>,
    inserted_id: Option<Bson>,
    calls: Vec<Call>,
}

/// Recording driver shared by every handle it hands out
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
    collections_created: Arc<AtomicUsize>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(self.clone())
    }

    pub fn set_connect(&self, behavior: Behavior) {
        self.state.lock().connect = behavior;
    }

    pub fn set_ping(&self, behavior: Behavior) {
        self.state.lock().ping = behavior;
    }

    pub fn reject_collection(&self, name: &str) {
        self.state.lock().rejected_collections.push(name.to_string());
    }

    pub fn fail_writes(&self, message: &str) {
        self.state.lock().store_error = Some(message.to_string());
    }

    pub fn set_inserted_id(&self, id: Bson) {
        self.state.lock().inserted_id = Some(id);
    }

    pub fn configs(&self) -> Vec<(String, PoolConfig)> {
        self.state.lock().configs.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn collections_created(&self) -> usize {
        self.collections_created.load(Ordering::SeqCst)
    }
}

async fn act(behavior: Behavior, make_err: fn(String) -> BasiliskError) -> Result<()> {
    match behavior {
        Behavior::Succeed => Ok(()),
        Behavior::Fail(msg) => Err(make_err(msg)),
        Behavior::Raise(err) => Err(err),
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }
}

#[async_trait]
impl Connector for MockStore {
    async fn connect(&self, address: &str, config: &PoolConfig) -> Result<Arc<dyn StoreClient>> {
        let behavior = {
            let mut state = self.state.lock();
            state.configs.push((address.to_string(), config.clone()));
            state.connect.clone()
        };
        act(behavior, BasiliskError::Connection).await?;

        Ok(Arc::new(MockClient {
            store: self.clone(),
            address: address.to_string(),
        }))
    }
}

struct MockClient {
    store: MockStore,
    address: String,
}

#[async_trait]
impl StoreClient for MockClient {
    async fn ping_primary(&self) -> Result<()> {
        let behavior = self.store.state.lock().ping.clone();
        act(behavior, BasiliskError::Unreachable).await
    }

    fn database(&self, name: &str) -> Arc<dyn StoreDatabase> {
        Arc::new(MockDatabase {
            store: self.store.clone(),
            address: self.address.clone(),
            name: name.to_string(),
        })
    }
}

struct MockDatabase {
    store: MockStore,
    address: String,
    name: String,
}

impl StoreDatabase for MockDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> Option<Arc<dyn StoreCollection>> {
        if self
            .store
            .state
            .lock()
            .rejected_collections
            .iter()
            .any(|rejected| rejected == name)
        {
            return None;
        }
        self.store.collections_created.fetch_add(1, Ordering::SeqCst);
        Some(Arc::new(MockCollection {
            store: self.store.clone(),
            address: self.address.clone(),
            name: name.to_string(),
        }))
    }
}

struct MockCollection {
    store: MockStore,
    address: String,
    name: String,
}

#[async_trait]
impl StoreCollection for MockCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, document: BsonDocument) -> Result<Bson> {
        let mut state = self.store.state.lock();
        if let Some(msg) = &state.store_error {
            return Err(BasiliskError::Store(msg.clone()));
        }
        state.calls.push(Call::Insert {
            address: self.address.clone(),
            collection: self.name.clone(),
            document,
        });
        Ok(state
            .inserted_id
            .clone()
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new())))
    }

    async fn update_one(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome> {
        let mut state = self.store.state.lock();
        if let Some(msg) = &state.store_error {
            return Err(BasiliskError::Store(msg.clone()));
        }
        state.calls.push(Call::Update {
            address: self.address.clone(),
            collection: self.name.clone(),
            filter,
            update,
            upsert: options.and_then(|o| o.upsert),
        });
        Ok(UpdateOutcome {
            matched_count: 1,
            modified_count: 1,
            upserted_id: None,
        })
    }
}

/// Install a test-friendly tracing subscriber; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
