//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - AuthProvider: session lookup and refresh
//! - RemoteEndpoint: authenticated fetch against the backend
//! - PersistenceStore: read/update of entity records
//!
//! These traits define the contracts that allow the domain to be independent
//! of specific infrastructure implementations.

pub mod auth_provider;
pub mod persistence_store;
pub mod remote_endpoint;

pub use auth_provider::AuthProvider;
pub use persistence_store::PersistenceStore;
pub use remote_endpoint::{RemoteEndpoint, RemoteResponse};
