//! Persistence store port.

use async_trait::async_trait;

use crate::domain::errors::PersistenceError;
use crate::domain::models::Resource;

/// Read/update access to entity records of one collection (`R::COLLECTION`).
///
/// There is no dedicated lock API: edit-lock fields are ordinary fields of
/// the record and are written through `update` like any other.
#[async_trait]
pub trait PersistenceStore<R: Resource>: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<R>, PersistenceError>;

    /// Apply `patch` to the record and return the stored result.
    async fn update(&self, id: &str, patch: &R::Patch) -> Result<R, PersistenceError>;
}
