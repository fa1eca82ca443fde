//! MongoDB client and typed collection wrapper
//!
//! Collections declare their indexes through [`IntoIndexes`]; opening a
//! collection applies them, so a fresh database is ready after first start.

use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::types::{ReporterError, Result};

/// MongoDB's duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

/// Schemas that declare their own indexes
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Shared MongoDB connection
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping. Fails fast when the server is unreachable.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Bound server selection so an unreachable server fails in seconds
        let has_path = uri
            .split_once("://")
            .is_some_and(|(_, rest)| rest.contains('/'));
        let sep = if uri.contains('?') {
            "&"
        } else if has_path {
            "?"
        } else {
            "/?"
        };
        let timeout_uri = format!(
            "{}{}serverSelectionTimeoutMS=3000&connectTimeoutMS=3000",
            uri, sep
        );

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| ReporterError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        let mongo = Self {
            client,
            db_name: db_name.to_string(),
        };
        mongo.ping().await?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(mongo)
    }

    /// Round-trip to the server; used by the health check
    pub async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ReporterError::Database(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }

    /// Open a typed collection, applying its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed collection
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = MongoCollection {
            inner: client.database(db_name).collection::<T>(collection_name),
        };
        collection.apply_indexes(collection_name).await?;
        Ok(collection)
    }

    async fn apply_indexes(&self, collection_name: &str) -> Result<()> {
        let indices: Vec<IndexModel> = T::into_indices()
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        if indices.is_empty() {
            return Ok(());
        }

        let count = indices.len();
        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| ReporterError::Database(format!("Failed to create indexes: {}", e)))?;

        debug!(collection = collection_name, count, "Indexes applied");
        Ok(())
    }

    /// Insert a document. A unique index violation becomes `Conflict`.
    pub async fn insert_one(&self, item: T) -> Result<ObjectId> {
        let result = self.inner.insert_one(item).await.map_err(|e| {
            if is_duplicate_key(&e) {
                ReporterError::Conflict("Duplicate key".into())
            } else {
                ReporterError::Database(format!("Insert failed: {}", e))
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| ReporterError::Database("Inserted id is not an ObjectId".into()))
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| ReporterError::Database(format!("Find failed: {}", e)))
    }

    /// Find all matches, optionally sorted
    pub async fn find_many(&self, filter: Document, sort: Option<Document>) -> Result<Vec<T>> {
        let mut find = self.inner.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }

        let cursor = find
            .await
            .map_err(|e| ReporterError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect::<Vec<T>>()
            .await
            .map_err(|e| ReporterError::Database(format!("Cursor read failed: {}", e)))
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, update)
            .await
            .map_err(|e| ReporterError::Database(format!("Update failed: {}", e)))
    }

    pub async fn update_many(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.inner
            .update_many(filter, update)
            .await
            .map_err(|e| ReporterError::Database(format!("Bulk update failed: {}", e)))
    }

    /// Hard delete; returns whether a document was removed
    pub async fn delete_one(&self, filter: Document) -> Result<bool> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| ReporterError::Database(format!("Delete failed: {}", e)))?;
        Ok(result.deleted_count > 0)
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| ReporterError::Database(format!("Count failed: {}", e)))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

/// Parse a hex id. Malformed ids cannot match any document, so callers
/// treat `None` as not found.
pub fn parse_oid(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}
