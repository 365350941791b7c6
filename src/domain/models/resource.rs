//! Entities that can be fetched by id through the remote endpoint and
//! written through the persistence store.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::errors::PersistenceError;

/// Caller-supplied data used to synthesize a record when the remote side
/// has none yet (e.g. a freshly signed-up user without a profile row).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackHint {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl FallbackHint {
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            display_name: None,
        }
    }
}

/// An entity addressable by id.
pub trait Resource: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection (table) the entity lives in.
    const COLLECTION: &'static str;

    /// Partial update accepted by the persistence store.
    type Patch: Clone + Debug + Serialize + Send + Sync + 'static;

    fn id(&self) -> String;

    /// Apply a patch in place, stamping `now` as the modification time.
    fn apply_patch(&mut self, patch: &Self::Patch, now: DateTime<Utc>) -> Result<(), PersistenceError>;

    /// Path of the entity on the remote endpoint, relative to its base URL.
    /// The id is percent-encoded so it cannot add query parameters.
    fn remote_path(id: &str) -> String {
        format!(
            "/rest/v1/{}?id=eq.{}&select=*",
            Self::COLLECTION,
            urlencoding::encode(id)
        )
    }

    /// Record to use when the endpoint reports no row for `id`.
    fn from_fallback(_id: &str, _hint: &FallbackHint) -> Option<Self> {
        None
    }
}
