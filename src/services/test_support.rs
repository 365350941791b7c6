//! Hand-written port fakes shared by the service unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::errors::{AuthError, NetworkError};
use crate::domain::models::{AccessToken, AuthSession};
use crate::domain::ports::{AuthProvider, RemoteEndpoint, RemoteResponse};

pub(crate) struct StubAuth {
    session: Mutex<Option<AuthSession>>,
    refresh_result: Result<AuthSession, AuthError>,
    refresh_calls: AtomicUsize,
}

impl StubAuth {
    pub(crate) fn signed_in(token: &str) -> Self {
        Self {
            session: Mutex::new(Some(AuthSession::new(token))),
            refresh_result: Err(AuthError::NoRefreshToken),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn signed_out() -> Self {
        Self {
            session: Mutex::new(None),
            refresh_result: Err(AuthError::NoSession),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_refresh(mut self, result: Result<AuthSession, AuthError>) -> Self {
        self.refresh_result = result;
        self
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for StubAuth {
    async fn get_session(&self) -> Option<AuthSession> {
        self.session.lock().unwrap().clone()
    }

    async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let session = self.refresh_result.clone()?;
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }
}

/// Endpoint that replays a fixed script of outcomes, one per call.
pub(crate) struct ScriptedEndpoint {
    script: Mutex<VecDeque<Result<RemoteResponse, NetworkError>>>,
    tokens: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Duration,
    panic_on_first_call: bool,
}

impl ScriptedEndpoint {
    pub(crate) fn new(script: Vec<Result<RemoteResponse, NetworkError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            tokens: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            panic_on_first_call: false,
        }
    }

    /// The first call panics instead of answering; later calls follow the script.
    pub(crate) fn panicking_once(mut self) -> Self {
        self.panic_on_first_call = true;
        self
    }

    /// Every call sleeps for `delay` before answering.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteEndpoint for ScriptedEndpoint {
    async fn authenticated_fetch(
        &self,
        _path: &str,
        token: &AccessToken,
    ) -> Result<RemoteResponse, NetworkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_first_call && call == 0 {
            panic!("endpoint blew up");
        }
        self.tokens.lock().unwrap().push(token.expose().to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(NetworkError::new("script exhausted")))
    }
}
