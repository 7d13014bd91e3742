//! Collection handle with insert and partial-update operations

use std::sync::Arc;

use bson::{doc, oid::ObjectId, Document as BsonDocument};
use mongodb::options::UpdateOptions;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::driver::{StoreCollection, UpdateOutcome};
use crate::flatten::{flatten, flatten_document, PathValueMap, UpdateRecord};
use crate::{BasiliskError, Result};

/// A cached handle to one collection of a [`crate::Database`].
///
/// Cloning is cheap; clones share the same driver handle.
#[derive(Clone)]
pub struct Collection {
    store: Arc<dyn StoreCollection>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.store.name())
            .finish()
    }
}

impl Collection {
    pub(crate) fn new(store: Arc<dyn StoreCollection>) -> Self {
        Self { store }
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }

    /// Returns true if both handles share the same driver collection.
    pub fn same_handle(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    /// Insert `document` into the collection.
    ///
    /// Returns the ObjectId the store generated for it.
    ///
    /// # Errors
    /// `Serialization` if the document cannot be encoded as BSON, `Store` if
    /// the driver fails or the generated id is not an ObjectId.
    #[instrument(skip(self, document), fields(collection = %self.name()))]
    pub async fn insert_one<T: Serialize + ?Sized>(&self, document: &T) -> Result<ObjectId> {
        let bson_doc = bson::to_document(document)?;

        let inserted_id = self.store.insert_one(bson_doc).await?;

        inserted_id
            .as_object_id()
            .ok_or_else(|| BasiliskError::Store(format!("Invalid inserted ID: {}", inserted_id)))
    }

    /// Update the first document matching `filter` with the non-zero fields
    /// of `update`.
    ///
    /// `update` is flattened into dotted paths (see [`crate::flatten::flatten`]) and
    /// sent as `{"$set": paths}`. An all-zero update still reaches the store
    /// as an empty `$set`.
    ///
    /// # Errors
    /// `Validation` if `filter` is `None` or `update` is not a record; nothing
    /// is sent to the store in that case. Driver failures come back as `Store`.
    #[instrument(skip_all, fields(collection = %self.name()))]
    pub async fn update_one<T: Serialize + ?Sized>(
        &self,
        filter: Option<BsonDocument>,
        update: &T,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome> {
        let filter = require_filter(filter)?;
        let paths = flatten_document(update)?;
        self.set_paths(filter, paths, options).await
    }

    /// Same as [`Collection::update_one`] for an explicitly built
    /// [`UpdateRecord`].
    #[instrument(skip_all, fields(collection = %self.name()))]
    pub async fn update_one_record(
        &self,
        filter: Option<BsonDocument>,
        update: &UpdateRecord,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome> {
        let filter = require_filter(filter)?;
        let paths = flatten(update);
        self.set_paths(filter, paths, options).await
    }

    async fn set_paths(
        &self,
        filter: BsonDocument,
        paths: PathValueMap,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome> {
        debug!(paths = paths.len(), "Flattened update document");

        self.store
            .update_one(filter, doc! { "$set": paths }, options)
            .await
    }
}

fn require_filter(filter: Option<BsonDocument>) -> Result<BsonDocument> {
    filter.ok_or_else(|| BasiliskError::Validation("Update filter cannot be null".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_filter() {
        let err = require_filter(None).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Update filter cannot be null");

        let filter = doc! { "user_id": "1" };
        assert_eq!(require_filter(Some(filter.clone())).unwrap(), filter);
    }

    #[test]
    fn test_empty_filter_is_not_null() {
        assert!(require_filter(Some(BsonDocument::new())).is_ok());
    }
}
