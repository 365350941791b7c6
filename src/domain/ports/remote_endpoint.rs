//! Remote data endpoint port.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::domain::errors::NetworkError;
use crate::domain::models::AccessToken;

/// Raw response of an authenticated fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RemoteResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// 401 and 403 both mean the token was not accepted.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
    }
}

/// Authenticated fetch primitive.
///
/// Any HTTP status, including errors, is an `Ok` response; `Err` means no
/// response was received at all.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    async fn authenticated_fetch(
        &self,
        path: &str,
        token: &AccessToken,
    ) -> Result<RemoteResponse, NetworkError>;
}
