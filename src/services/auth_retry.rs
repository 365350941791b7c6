//! Authenticated fetch with a single token refresh on rejection.
//!
//! The flow is a small state machine so every transition can be tested on its
//! own. A request makes at most two remote calls and at most one refresh:
//!
//! ```text
//! Fetching --2xx--> Succeeded
//! Fetching --401/403--> RefreshingToken --ok--> RetryingFetch --2xx--> Succeeded
//!                                      \--err--> Failed(AuthenticationFailed)
//! RetryingFetch --401/403--> Failed(AuthenticationFailed)
//! any fetch --other status--> Failed(FetchFailed)
//! any fetch --transport--> Failed(Network)
//! ```

use tracing::{debug, warn};

use crate::domain::errors::{AuthError, FetchError, NetworkError};
use crate::domain::models::AccessToken;
use crate::domain::ports::{AuthProvider, RemoteEndpoint, RemoteResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Fetching,
    RefreshingToken,
    RetryingFetch(AccessToken),
    Succeeded(RemoteResponse),
    Failed(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    Response(RemoteResponse),
    TransportFailed(NetworkError),
    Refreshed(AccessToken),
    RefreshFailed(AuthError),
}

impl RetryState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::RefreshingToken => "refreshing token",
            Self::RetryingFetch(_) => "retrying fetch",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }

    /// Next state for `event`. Pairs outside the transition table fail the request.
    pub fn on_event(self, event: RetryEvent) -> Self {
        match (self, event) {
            (Self::Fetching, RetryEvent::Response(response)) => {
                if response.status.is_success() {
                    Self::Succeeded(response)
                } else if response.is_auth_rejection() {
                    Self::RefreshingToken
                } else {
                    Self::Failed(FetchError::FetchFailed(response.status))
                }
            }
            (Self::RetryingFetch(_), RetryEvent::Response(response)) => {
                if response.status.is_success() {
                    Self::Succeeded(response)
                } else if response.is_auth_rejection() {
                    Self::Failed(FetchError::AuthenticationFailed)
                } else {
                    Self::Failed(FetchError::FetchFailed(response.status))
                }
            }
            (Self::Fetching | Self::RetryingFetch(_), RetryEvent::TransportFailed(err)) => {
                Self::Failed(FetchError::Network(err))
            }
            (Self::RefreshingToken, RetryEvent::Refreshed(token)) => Self::RetryingFetch(token),
            (Self::RefreshingToken, RetryEvent::RefreshFailed(_)) => {
                Self::Failed(FetchError::AuthenticationFailed)
            }
            (state, event) => Self::Failed(FetchError::InvalidTransition {
                state: state.name(),
                event: event.name(),
            }),
        }
    }
}

impl RetryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Response(_) => "response",
            Self::TransportFailed(_) => "transport failure",
            Self::Refreshed(_) => "token refresh",
            Self::RefreshFailed(_) => "refresh failure",
        }
    }
}

async fn fetch_event(endpoint: &dyn RemoteEndpoint, path: &str, token: &AccessToken) -> RetryEvent {
    match endpoint.authenticated_fetch(path, token).await {
        Ok(response) => RetryEvent::Response(response),
        Err(err) => RetryEvent::TransportFailed(err),
    }
}

async fn refresh_event(auth: &dyn AuthProvider) -> RetryEvent {
    match auth.refresh_session().await {
        Ok(session) => RetryEvent::Refreshed(session.access_token),
        Err(err) => {
            warn!(error = %err, "Token refresh failed");
            RetryEvent::RefreshFailed(err)
        }
    }
}

/// Fetch `path` with the current session, refreshing the token once if the
/// endpoint rejects it.
///
/// Fails with [`FetchError::NoAuthToken`] without any remote call when there
/// is no session.
pub async fn fetch_with_auth_retry(
    auth: &dyn AuthProvider,
    endpoint: &dyn RemoteEndpoint,
    path: &str,
) -> Result<RemoteResponse, FetchError> {
    let Some(session) = auth.get_session().await else {
        return Err(FetchError::NoAuthToken);
    };
    let token = session.access_token;

    let mut state = RetryState::Fetching;
    loop {
        let event = match state {
            RetryState::Succeeded(response) => return Ok(response),
            RetryState::Failed(err) => return Err(err),
            RetryState::Fetching => fetch_event(endpoint, path, &token).await,
            RetryState::RefreshingToken => {
                debug!(path, "Token rejected, refreshing session");
                refresh_event(auth).await
            }
            RetryState::RetryingFetch(ref fresh) => fetch_event(endpoint, path, fresh).await,
        };
        state = state.on_event(event);
    }
}
