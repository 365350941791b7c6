//! Ideaboard - freshness and concurrency layer for a collaborative idea board
//!
//! Keeps remotely stored board entities fresh without hammering the backend,
//! and keeps two people from editing the same idea card at once.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and the ports the services depend on
//! - **Service Layer** (`services`): TTL cache, deduplicating fetch with auth retry, edit locks
//! - **Adapters** (`adapters`): HTTP endpoint and auth, SQLite and in-memory stores
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use ideaboard::services::FetchService;
//! use ideaboard::domain::models::{FallbackHint, Profile};
//!
//! let service: FetchService<Profile> = FetchService::new(auth, endpoint, store, ttl);
//! let profile = service.fetch("user-1", &FallbackHint::default()).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{AuthError, FetchError, NetworkError, PersistenceError};
pub use domain::models::{
    Config, EditLock, FallbackHint, Idea, IdeaPatch, LockBadge, Profile, ProfilePatch, Resource,
    UserId,
};
pub use domain::ports::{AuthProvider, PersistenceStore, RemoteEndpoint, RemoteResponse};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{EditLockCoordinator, FetchService, TtlCache};
