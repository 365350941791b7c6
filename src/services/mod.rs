//! Services: the TTL cache, the deduplicating fetch service and the edit
//! lock coordinator.

pub mod auth_retry;
pub mod edit_lock_coordinator;
pub mod fetch_service;
pub mod ttl_cache;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_retry::{fetch_with_auth_retry, RetryEvent, RetryState};
pub use edit_lock_coordinator::{AcquireOutcome, EditAttempt, EditLockCoordinator, LockView};
pub use fetch_service::FetchService;
pub use ttl_cache::TtlCache;
