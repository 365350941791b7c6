//! Domain models.

pub mod config;
pub mod edit_lock;
pub mod idea;
pub mod profile;
pub mod resource;
pub mod session;
pub mod user;

pub use config::{
    AuthConfig, CacheConfig, Config, DatabaseConfig, EndpointConfig, FetchConfig, LockConfig,
    LoggingConfig,
};
pub use edit_lock::{default_lease, EditLock, EditLockFields, LockBadge, LockLabel, DEFAULT_LEASE_MS};
pub use idea::{Idea, IdeaPatch, MatrixPosition, MATRIX_MAX};
pub use profile::{Profile, ProfilePatch, ProfileRole};
pub use resource::{FallbackHint, Resource};
pub use session::{AccessToken, AuthSession};
pub use user::UserId;
