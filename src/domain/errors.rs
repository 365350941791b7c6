//! Domain errors for the ideaboard freshness layer.
//!
//! Fetch errors are shared verbatim between every caller joined onto one
//! in-flight request, so they are `Clone` and carry rendered messages rather
//! than live source errors.

use reqwest::StatusCode;
use thiserror::Error;

use super::models::UserId;

/// Transport-level failure: the remote endpoint produced no response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NetworkError {
    message: String,
    timed_out: bool,
}

impl NetworkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the underlying client gave up waiting for a response.
    pub fn is_timeout(&self) -> bool {
        self.timed_out
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else {
            Self::new(err.to_string())
        }
    }
}

/// Errors surfaced by the deduplicating fetch service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("No authentication session available")]
    NoAuthToken,

    #[error("Authentication failed after token refresh")]
    AuthenticationFailed,

    #[error("Fetch failed with status {0}")]
    FetchFailed(StatusCode),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Fetch service destroyed before the request completed")]
    Destroyed,

    #[error("Unexpected {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

impl FetchError {
    /// Returns true if the user must sign in again to recover.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::NoAuthToken | Self::AuthenticationFailed)
    }

    /// Message suitable for direct display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoAuthToken | Self::AuthenticationFailed => {
                "Your session has expired, please log in again."
            }
            Self::Network(_) => "Could not reach the server. Check your connection.",
            Self::NotFound(_) => "The requested item no longer exists.",
            Self::Destroyed => "The request was cancelled.",
            Self::FetchFailed(_) | Self::Decode(_) | Self::InvalidTransition { .. } => {
                "Something went wrong loading data."
            }
        }
    }
}

/// Errors from the persistence store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{collection} record not found: {id}")]
    NotFound { collection: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<EditLockError> for PersistenceError {
    fn from(err: EditLockError) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors from the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No session to refresh")]
    NoSession,

    #[error("Session has no refresh token")]
    NoRefreshToken,

    #[error("Token refresh rejected with status {0}")]
    Rejected(StatusCode),

    #[error("Network error during refresh: {0}")]
    Network(#[from] NetworkError),

    #[error("Invalid refresh response: {0}")]
    Decode(String),
}

/// Lock fields read from a record violate the `editing_by => editing_at` invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditLockError {
    #[error("Edit lock held by {user} has no timestamp")]
    MissingTimestamp { user: UserId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_login() {
        assert!(FetchError::NoAuthToken.requires_login());
        assert!(FetchError::AuthenticationFailed.requires_login());
        assert!(!FetchError::FetchFailed(StatusCode::INTERNAL_SERVER_ERROR).requires_login());
        assert!(!FetchError::Destroyed.requires_login());
    }

    #[test]
    fn test_user_message_for_auth_failure() {
        assert!(FetchError::AuthenticationFailed
            .user_message()
            .contains("log in again"));
    }

    #[test]
    fn test_error_display() {
        let error = FetchError::FetchFailed(StatusCode::NOT_FOUND);
        assert_eq!(error.to_string(), "Fetch failed with status 404 Not Found");

        let error = FetchError::Network(NetworkError::new("connection refused"));
        assert_eq!(error.to_string(), "Network error: connection refused");

        let error = PersistenceError::NotFound {
            collection: "ideas",
            id: "abc".to_string(),
        };
        assert_eq!(error.to_string(), "ideas record not found: abc");
    }

    #[test]
    fn test_network_timeout_flag() {
        assert!(NetworkError::timeout("deadline").is_timeout());
        assert!(!NetworkError::new("reset").is_timeout());
    }
}
