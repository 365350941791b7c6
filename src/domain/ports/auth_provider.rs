//! Authentication provider port.

use async_trait::async_trait;

use crate::domain::errors::AuthError;
use crate::domain::models::AuthSession;

/// Source of access tokens for authenticated remote calls.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, or `None` when nobody is signed in.
    async fn get_session(&self) -> Option<AuthSession>;

    /// Exchange the current session for a fresh one.
    async fn refresh_session(&self) -> Result<AuthSession, AuthError>;
}
