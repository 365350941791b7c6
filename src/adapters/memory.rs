//! In-memory persistence store for tests. The CLI always uses the SQLite
//! stores.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::errors::PersistenceError;
use crate::domain::models::Resource;
use crate::domain::ports::PersistenceStore;

pub struct InMemoryStore<R: Resource> {
    records: RwLock<HashMap<String, R>>,
}

impl<R: Resource> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id(), r)).collect()),
        }
    }

    /// Insert or replace a record.
    pub async fn insert(&self, record: R) {
        self.records.write().await.insert(record.id(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl<R: Resource> PersistenceStore<R> for InMemoryStore<R> {
    async fn get(&self, id: &str) -> Result<Option<R>, PersistenceError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<R, PersistenceError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(id).ok_or_else(|| PersistenceError::NotFound {
            collection: R::COLLECTION,
            id: id.to_string(),
        })?;

        // Patch a copy so a rejected patch leaves the stored record untouched.
        let mut updated = record.clone();
        updated.apply_patch(patch, Utc::now())?;
        *record = updated.clone();
        Ok(updated)
    }
}
