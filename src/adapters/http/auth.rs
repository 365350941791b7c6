use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use super::{build_client, join_url};
use crate::domain::errors::{AuthError, NetworkError};
use crate::domain::models::{AccessToken, AuthConfig, AuthSession, EndpointConfig, UserId};
use crate::domain::ports::AuthProvider;
use crate::infrastructure::logging::SecretScrubber;

const REFRESH_PATH: &str = "/auth/v1/token?grant_type=refresh_token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
}

/// Holds the current session and refreshes it against the backend's token
/// endpoint.
pub struct HttpAuthProvider {
    http_client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
    session: RwLock<Option<AuthSession>>,
    scrubber: SecretScrubber,
}

impl HttpAuthProvider {
    pub fn new(config: &EndpointConfig, session: Option<AuthSession>) -> Result<Self> {
        Ok(Self {
            http_client: build_client(config.timeout_secs)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            session: RwLock::new(session),
            scrubber: SecretScrubber::new(),
        })
    }

    /// Build from configured tokens. No access token means signed out.
    pub fn from_config(endpoint: &EndpointConfig, auth: &AuthConfig) -> Result<Self> {
        let session = auth.access_token.as_ref().map(|token| {
            let mut session = AuthSession::new(token.clone());
            session.refresh_token = auth.refresh_token.clone();
            session.user_id = auth.user_id.as_deref().map(UserId::from);
            session
        });
        Self::new(endpoint, session)
    }

    /// Replace the session, e.g. after sign-in or sign-out.
    pub async fn set_session(&self, session: Option<AuthSession>) {
        *self.session.write().await = session;
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn get_session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    #[instrument(skip(self))]
    async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        let previous = self.session.read().await.clone().ok_or(AuthError::NoSession)?;
        let refresh_token = previous.refresh_token.clone().ok_or(AuthError::NoRefreshToken)?;

        let mut request = self
            .http_client
            .post(join_url(&self.base_url, REFRESH_PATH))
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key);
        }

        let response = request.send().await.map_err(NetworkError::from)?;
        let status = response.status();
        let body = response.text().await.map_err(NetworkError::from)?;

        if !status.is_success() {
            warn!(%status, body = %self.scrubber.scrub(&body), "Token refresh rejected");
            return Err(AuthError::Rejected(status));
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Decode(e.to_string()))?;

        let session = AuthSession {
            access_token: AccessToken::new(token.access_token),
            refresh_token: token.refresh_token.or(Some(refresh_token)),
            expires_at: expiry_after(token.expires_in),
            user_id: token.user.map(|u| UserId::from(u.id)).or(previous.user_id),
        };

        *self.session.write().await = Some(session.clone());
        info!("Session refreshed");
        Ok(session)
    }
}

/// Absolute expiry for a token valid for `expires_in` seconds. Values too
/// large to represent yield no expiry.
fn expiry_after(expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in
        .and_then(chrono::Duration::try_seconds)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_after_tolerates_out_of_range_lifetimes() {
        assert!(expiry_after(None).is_none());
        assert!(expiry_after(Some(3600)).is_some_and(|at| at > Utc::now()));
        assert!(expiry_after(Some(i64::MAX / 2000)).is_none());
        assert!(expiry_after(Some(i64::MAX)).is_none());
    }

    fn endpoint_config() -> EndpointConfig {
        EndpointConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..EndpointConfig::default()
        }
    }

    #[tokio::test]
    async fn test_from_config_without_token_is_signed_out() {
        let provider = HttpAuthProvider::from_config(&endpoint_config(), &AuthConfig::default()).unwrap();
        assert!(provider.get_session().await.is_none());
        assert_eq!(provider.refresh_session().await, Err(AuthError::NoSession));
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let provider =
            HttpAuthProvider::new(&endpoint_config(), Some(AuthSession::new("access"))).unwrap();
        assert_eq!(provider.refresh_session().await, Err(AuthError::NoRefreshToken));
    }

    #[tokio::test]
    async fn test_set_session_replaces_current() {
        let provider = HttpAuthProvider::new(&endpoint_config(), None).unwrap();
        provider.set_session(Some(AuthSession::new("t1"))).await;

        let session = provider.get_session().await.unwrap();
        assert_eq!(session.access_token.expose(), "t1");
    }
}
