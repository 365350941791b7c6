//! Domain layer for the ideaboard freshness layer
//!
//! This module contains core models, errors and the ports implemented by adapters.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{AuthError, EditLockError, FetchError, NetworkError, PersistenceError};
