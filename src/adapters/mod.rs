//! Infrastructure adapters for external systems.

pub mod http;
pub mod memory;
pub mod sqlite;

pub use http::{HttpAuthProvider, HttpRemoteEndpoint};
pub use memory::InMemoryStore;
pub use sqlite::{SqliteIdeaStore, SqliteProfileStore};
