//! SQLite-backed record store.

use std::{marker::PhantomData, path::Path, sync::Arc};

use async_trait::async_trait;
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;

use crate::{record::Entity, types::RecordId};

use super::{RecordStore, StoreError, StoreResult};

/// Record store persisting JSON payloads in a local SQLite database.
///
/// Every entity kind shares one `records` table, partitioned by
/// [`Entity::COLLECTION`]. Rows keep their creation order.
pub struct SqliteRecordStore<E: Entity> {
    conn: Arc<Mutex<Connection>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteRecordStore<E> {
    /// Opens or creates a database at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            _entity: PhantomData,
        })
    }

    /// Store for another entity kind over the same connection.
    pub fn for_kind<F: Entity>(&self) -> SqliteRecordStore<F> {
        SqliteRecordStore {
            conn: Arc::clone(&self.conn),
            _entity: PhantomData,
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Message(format!("join error: {e}")))?
    }
}

/// Raises the next generated key of `kind` to at least `next`.
fn bump_counter(conn: &Connection, kind: &str, next: RecordId) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO key_counters(kind, next_seq) VALUES (?1, ?2)
         ON CONFLICT(kind) DO UPDATE SET next_seq = MAX(next_seq, excluded.next_seq)",
        params![kind, next as i64],
    )?;
    Ok(())
}

#[async_trait]
impl<E: Entity> RecordStore<E> for SqliteRecordStore<E> {
    async fn list_all(&self) -> StoreResult<Vec<E>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT payload FROM records WHERE kind = ?1 ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map(params![E::COLLECTION], |row| row.get::<_, Vec<u8>>(0))?;

            let mut out = Vec::new();
            for payload in rows {
                out.push(serde_json::from_slice(&payload?)?);
            }
            Ok(out)
        })
        .await
    }

    async fn create(&self, mut record: E) -> StoreResult<E> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let key = match record.key() {
                Some(key) => {
                    // Keep generated keys clear of numeric keys supplied here.
                    if let Ok(seq) = key.to_string().parse::<RecordId>() {
                        bump_counter(&tx, E::COLLECTION, seq.saturating_add(1))?;
                    }
                    key
                }
                None => {
                    let next: Option<i64> = tx
                        .query_row(
                            "SELECT next_seq FROM key_counters WHERE kind = ?1",
                            params![E::COLLECTION],
                            |row| row.get(0),
                        )
                        .optional()?;
                    let seq = next.unwrap_or(1) as RecordId;
                    let key = E::key_from_seq(seq).ok_or_else(|| {
                        StoreError::Message(format!("{} requires a caller-assigned key", E::LABEL))
                    })?;
                    bump_counter(&tx, E::COLLECTION, seq + 1)?;
                    record.set_key(Some(key.clone()));
                    key
                }
            };

            let key_text = key.to_string();
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM records WHERE kind = ?1 AND record_key = ?2",
                    params![E::COLLECTION, key_text],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Err(StoreError::Conflict(key_text));
            }

            let payload = serde_json::to_vec(&record)?;
            tx.execute(
                "INSERT INTO records(kind, record_key, seq, payload)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM records WHERE kind = ?1), ?3)",
                params![E::COLLECTION, key_text, payload],
            )?;
            tx.commit()?;

            debug!("sqlite store created {} {}", E::LABEL, key_text);
            Ok(record)
        })
        .await
    }

    async fn update(&self, key: &E::Key, mut record: E) -> StoreResult<E> {
        let key = key.clone();
        self.with_conn(move |conn| {
            record.set_key(Some(key.clone()));
            let payload = serde_json::to_vec(&record)?;
            let changed = conn.execute(
                "UPDATE records SET payload = ?3 WHERE kind = ?1 AND record_key = ?2",
                params![E::COLLECTION, key.to_string(), payload],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(key.to_string()));
            }
            Ok(record)
        })
        .await
    }

    async fn delete(&self, key: &E::Key) -> StoreResult<()> {
        let key_text = key.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM records WHERE kind = ?1 AND record_key = ?2",
                params![E::COLLECTION, key_text],
            )?;
            if removed == 0 {
                return Err(StoreError::NotFound(key_text));
            }
            Ok(())
        })
        .await
    }
}
