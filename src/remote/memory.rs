use async_trait::async_trait;
use hashbrown::HashMap;
use tokio::sync::Mutex;

use crate::{record::Entity, types::RecordId};

use super::{RecordStore, StoreError, StoreResult};

#[derive(Debug)]
struct Inner<E: Entity> {
    records: HashMap<E::Key, E>,
    order: Vec<E::Key>,
    next_seq: RecordId,
}

/// In-process store keeping records in creation order.
///
/// Store-assigned keys come from a counter starting at 1.
#[derive(Debug)]
pub struct MemoryStore<E: Entity> {
    inner: Mutex<Inner<E>>,
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryStore<E> {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Seeds the store, assigning keys where missing.
    pub fn with_records(records: impl IntoIterator<Item = E>) -> StoreResult<Self> {
        let mut inner = Inner::new();
        for rec in records {
            inner.insert(rec)?;
        }
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.order.len()
    }

    /// True when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<E: Entity> Inner<E> {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            next_seq: 1,
        }
    }

    fn insert(&mut self, mut record: E) -> StoreResult<E> {
        let key = match record.key() {
            Some(key) => {
                if let Ok(seq) = key.to_string().parse::<RecordId>() {
                    self.next_seq = self.next_seq.max(seq.saturating_add(1));
                }
                key
            }
            None => {
                let key = E::key_from_seq(self.next_seq).ok_or_else(|| {
                    StoreError::Message(format!("{} requires a caller-assigned key", E::LABEL))
                })?;
                self.next_seq += 1;
                record.set_key(Some(key.clone()));
                key
            }
        };

        if self.records.contains_key(&key) {
            return Err(StoreError::Conflict(key.to_string()));
        }

        self.order.push(key.clone());
        self.records.insert(key, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl<E: Entity> RecordStore<E> for MemoryStore<E> {
    async fn list_all(&self) -> StoreResult<Vec<E>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|key| inner.records.get(key).cloned())
            .collect())
    }

    async fn create(&self, record: E) -> StoreResult<E> {
        self.inner.lock().await.insert(record)
    }

    async fn update(&self, key: &E::Key, mut record: E) -> StoreResult<E> {
        let mut inner = self.inner.lock().await;
        let slot = inner
            .records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        record.set_key(Some(key.clone()));
        *slot = record.clone();
        Ok(record)
    }

    async fn delete(&self, key: &E::Key) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.records.remove(key).is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if let Some(pos) = inner.order.iter().position(|k| k == key) {
            inner.order.remove(pos);
        }
        Ok(())
    }
}
