//! Record store abstraction and its in-memory, SQLite and HTTP backends.

/// REST client backend.
pub mod http;
/// In-process backend.
pub mod memory;
/// Local SQLite backend.
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::record::Entity;

/// Any failure reported by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection, protocol or body decoding failure.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response.
    #[error("server responded {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Payload (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// No record under the given key.
    #[error("record {0} not found")]
    NotFound(String),
    /// A record with the given key already exists.
    #[error("record {0} already exists")]
    Conflict(String),
    /// Anything else.
    #[error("{0}")]
    Message(String),
}

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Remote persistence for one entity type.
#[async_trait]
pub trait RecordStore<E: Entity>: Send + Sync + 'static {
    /// Fetches the whole collection in store order.
    async fn list_all(&self) -> StoreResult<Vec<E>>;

    /// Creates a record, returning it with its key assigned.
    async fn create(&self, record: E) -> StoreResult<E>;

    /// Replaces the record stored under `key`.
    async fn update(&self, key: &E::Key, record: E) -> StoreResult<E>;

    /// Deletes the record stored under `key`.
    async fn delete(&self, key: &E::Key) -> StoreResult<()>;
}

#[async_trait]
impl<E, S> RecordStore<E> for std::sync::Arc<S>
where
    E: Entity,
    S: RecordStore<E> + ?Sized,
{
    async fn list_all(&self) -> StoreResult<Vec<E>> {
        (**self).list_all().await
    }

    async fn create(&self, record: E) -> StoreResult<E> {
        (**self).create(record).await
    }

    async fn update(&self, key: &E::Key, record: E) -> StoreResult<E> {
        (**self).update(key, record).await
    }

    async fn delete(&self, key: &E::Key) -> StoreResult<()> {
        (**self).delete(key).await
    }
}
