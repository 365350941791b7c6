//! Deduplicating, caching fetch of remote entities.
//!
//! Concurrent `fetch` calls for the same id share one remote request. A
//! request is registered in the pending map inside the same critical section
//! that checks the cache, and it is removed in the same critical section that
//! stores its result, so a caller either hits the cache, joins the in-flight
//! request, or starts a new one. Joined callers wait on a `watch` channel and
//! all observe the identical outcome.
//!
//! Failures are never cached. Successful values live for the configured
//! entity TTL or until `update` invalidates them.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn, Instrument};

use super::auth_retry::fetch_with_auth_retry;
use super::ttl_cache::TtlCache;
use crate::domain::errors::{FetchError, PersistenceError};
use crate::domain::models::{Config, FallbackHint, Resource};
use crate::domain::ports::{AuthProvider, PersistenceStore, RemoteEndpoint};

type Outcome<R> = Option<Result<R, FetchError>>;

struct PendingRequest<R> {
    outcome: watch::Receiver<Outcome<R>>,
    task: JoinHandle<()>,
}

/// State shared between the service and its request tasks.
struct Shared<R> {
    cache: TtlCache<String, R>,
    pending: Mutex<HashMap<String, PendingRequest<R>>>,
    destroyed: AtomicBool,
}

impl<R: Resource> Shared<R> {
    fn pending(&self) -> MutexGuard<'_, HashMap<String, PendingRequest<R>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Publish the result of the request for `id`. Runs in one critical
    /// section with the cache write and the pending removal.
    fn complete(&self, id: String, result: Result<R, FetchError>, tx: &watch::Sender<Outcome<R>>) {
        let mut pending = self.pending();
        if self.is_destroyed() || pending.remove(&id).is_none() {
            tx.send_replace(Some(Err(FetchError::Destroyed)));
            return;
        }
        match &result {
            Ok(value) => {
                self.cache.set(id, value.clone());
                info!(collection = R::COLLECTION, "Fetch completed");
            }
            Err(err) => warn!(collection = R::COLLECTION, error = %err, "Fetch failed"),
        }
        tx.send_replace(Some(result));
    }

    fn teardown(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cache.destroy();
        let drained: Vec<PendingRequest<R>> = self.pending().drain().map(|(_, p)| p).collect();
        let aborted = drained.len();
        for request in drained {
            request.task.abort();
        }
        debug!(collection = R::COLLECTION, aborted, "Fetch service destroyed");
    }
}

/// Owns a request's pending entry until the result is published. If the
/// request task unwinds or is aborted first, dropping the guard removes the
/// entry and fails the joined callers with [`FetchError::Destroyed`].
struct PendingGuard<R: Resource> {
    shared: Arc<Shared<R>>,
    id: String,
    tx: Option<watch::Sender<Outcome<R>>>,
}

impl<R: Resource> PendingGuard<R> {
    fn complete(mut self, result: Result<R, FetchError>) {
        if let Some(tx) = self.tx.take() {
            self.shared.complete(std::mem::take(&mut self.id), result, &tx);
        }
    }
}

impl<R: Resource> Drop for PendingGuard<R> {
    fn drop(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        // No other request for this id can be registered while ours is.
        let removed = self.shared.pending().remove(&self.id).is_some();
        if removed {
            warn!(collection = R::COLLECTION, "Fetch task ended without a result");
        }
        tx.send_replace(Some(Err(FetchError::Destroyed)));
    }
}

/// Fetches entities of type `R` through the auth retry flow, caching and
/// deduplicating by id.
///
/// Build one per resource type and share it behind an `Arc`. Dropping the
/// service tears it down like [`FetchService::destroy`].
pub struct FetchService<R: Resource> {
    auth: Arc<dyn AuthProvider>,
    endpoint: Arc<dyn RemoteEndpoint>,
    store: Arc<dyn PersistenceStore<R>>,
    shared: Arc<Shared<R>>,
}

impl<R: Resource> FetchService<R> {
    /// Create a service whose cached values live for `ttl`.
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        endpoint: Arc<dyn RemoteEndpoint>,
        store: Arc<dyn PersistenceStore<R>>,
        ttl: Duration,
    ) -> Self {
        Self::with_cache(auth, endpoint, store, TtlCache::new(ttl))
    }

    /// Create a service whose cache follows `config.cache`, with the TTL
    /// overridden by `fetch.entity_ttl_ms` when set.
    pub fn from_config(
        auth: Arc<dyn AuthProvider>,
        endpoint: Arc<dyn RemoteEndpoint>,
        store: Arc<dyn PersistenceStore<R>>,
        config: &Config,
    ) -> Self {
        let cache = TtlCache::from_config(&config.entity_cache());
        Self::with_cache(auth, endpoint, store, cache)
    }

    fn with_cache(
        auth: Arc<dyn AuthProvider>,
        endpoint: Arc<dyn RemoteEndpoint>,
        store: Arc<dyn PersistenceStore<R>>,
        cache: TtlCache<String, R>,
    ) -> Self {
        Self {
            auth,
            endpoint,
            store,
            shared: Arc::new(Shared {
                cache,
                pending: Mutex::new(HashMap::new()),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Fetch the entity `id`, from cache if fresh, otherwise from the remote
    /// endpoint. Concurrent calls for the same id share one remote request.
    ///
    /// `hint` is used to synthesize a record when the endpoint returns no row
    /// and the resource type supports it.
    #[instrument(skip(self, hint), fields(collection = R::COLLECTION))]
    pub async fn fetch(&self, id: &str, hint: &FallbackHint) -> Result<R, FetchError> {
        let mut outcome = {
            let mut pending = self.shared.pending();
            if self.shared.is_destroyed() {
                return Err(FetchError::Destroyed);
            }
            if let Some(value) = self.shared.cache.get(id) {
                debug!("Cache hit");
                return Ok(value);
            }
            match pending.get(id) {
                Some(request) => {
                    debug!("Joining in-flight request");
                    request.outcome.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    let task = tokio::spawn(
                        Self::run_request(
                            Arc::clone(&self.auth),
                            Arc::clone(&self.endpoint),
                            Arc::clone(&self.shared),
                            id.to_string(),
                            hint.clone(),
                            tx,
                        )
                        .in_current_span(),
                    );
                    pending.insert(
                        id.to_string(),
                        PendingRequest {
                            outcome: rx.clone(),
                            task,
                        },
                    );
                    rx
                }
            }
        };

        // Bound to a local so the borrowed `watch::Ref` drops before `outcome`.
        #[allow(clippy::let_and_return)]
        let result = match outcome.wait_for(Option::is_some).await {
            Ok(published) => published.clone().unwrap_or(Err(FetchError::Destroyed)),
            // Sender dropped without publishing: the task was aborted.
            Err(_) => Err(FetchError::Destroyed),
        };
        result
    }

    async fn run_request(
        auth: Arc<dyn AuthProvider>,
        endpoint: Arc<dyn RemoteEndpoint>,
        shared: Arc<Shared<R>>,
        id: String,
        hint: FallbackHint,
        tx: watch::Sender<Outcome<R>>,
    ) {
        let guard = PendingGuard {
            shared,
            id,
            tx: Some(tx),
        };
        let path = R::remote_path(&guard.id);
        let result = match fetch_with_auth_retry(auth.as_ref(), endpoint.as_ref(), &path).await {
            Ok(response) => decode_body::<R>(&guard.id, &hint, &response.body),
            Err(err) => Err(err),
        };
        guard.complete(result);
    }

    /// Write `patch` through the persistence store. On success the cached
    /// value for `id` is invalidated; on failure the cache is left alone.
    #[instrument(skip(self, patch), fields(collection = R::COLLECTION))]
    pub async fn update(&self, id: &str, patch: &R::Patch) -> Result<R, PersistenceError> {
        match self.store.update(id, patch).await {
            Ok(updated) => {
                self.shared.cache.delete(id);
                info!("Record updated, cached value invalidated");
                Ok(updated)
            }
            Err(err) => {
                warn!(error = %err, "Update failed");
                Err(err)
            }
        }
    }

    /// Drop every cached value. In-flight requests still complete and
    /// repopulate the cache.
    pub fn clear_cache(&self) {
        self.shared.cache.clear();
    }

    /// Number of ids with a request in flight.
    pub fn pending_count(&self) -> usize {
        self.shared.pending().len()
    }

    pub fn store(&self) -> &Arc<dyn PersistenceStore<R>> {
        &self.store
    }

    /// Abort all in-flight requests and drop the cache. Waiting callers get
    /// [`FetchError::Destroyed`], as does every later `fetch`.
    pub fn destroy(&self) {
        self.shared.teardown();
    }
}

impl<R: Resource> Drop for FetchService<R> {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

/// Decode a response body holding either a single object or an array of at
/// most one row. No row at all falls back to `R::from_fallback`.
pub fn decode_body<R: Resource>(id: &str, hint: &FallbackHint, body: &str) -> Result<R, FetchError> {
    let body = body.trim();
    let row = if body.is_empty() {
        None
    } else {
        let value: Value =
            serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
        match value {
            Value::Null => None,
            Value::Array(mut rows) => match rows.len() {
                0 | 1 => rows.pop(),
                n => {
                    return Err(FetchError::Decode(format!(
                        "expected at most one {} row for {}, got {}",
                        R::COLLECTION,
                        id,
                        n
                    )))
                }
            },
            other => Some(other),
        }
    };

    match row {
        Some(row) => serde_json::from_value(row).map_err(|e| FetchError::Decode(e.to_string())),
        None => R::from_fallback(id, hint).ok_or_else(|| FetchError::NotFound(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::errors::{AuthError, NetworkError};
    use crate::domain::models::{AuthSession, Profile, ProfilePatch};
    use crate::domain::ports::RemoteResponse;
    use crate::services::test_support::{ScriptedEndpoint, StubAuth};
    use reqwest::StatusCode;

    const TTL: Duration = Duration::from_secs(300);

    fn profile(id: &str) -> Profile {
        Profile::new(id, Some(format!("{id}@example.com")))
    }

    fn profile_body(id: &str) -> RemoteResponse {
        let row = serde_json::to_string(&profile(id)).unwrap();
        RemoteResponse::ok(format!("[{row}]"))
    }

    struct Harness {
        auth: Arc<StubAuth>,
        endpoint: Arc<ScriptedEndpoint>,
        store: Arc<InMemoryStore<Profile>>,
        service: FetchService<Profile>,
    }

    fn harness(auth: StubAuth, endpoint: ScriptedEndpoint) -> Harness {
        let auth = Arc::new(auth);
        let endpoint = Arc::new(endpoint);
        let store = Arc::new(InMemoryStore::with_records([profile("u1")]));
        let service = FetchService::new(auth.clone(), endpoint.clone(), store.clone(), TTL);
        Harness {
            auth,
            endpoint,
            store,
            service,
        }
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let h = harness(StubAuth::signed_in("t"), ScriptedEndpoint::new(vec![Ok(profile_body("u1"))]));

        let first = h.service.fetch("u1", &FallbackHint::default()).await.unwrap();
        let second = h.service.fetch("u1", &FallbackHint::default()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.endpoint.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_request() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(profile_body("u1"))])
            .with_delay(Duration::from_millis(50));
        let h = harness(StubAuth::signed_in("t"), endpoint);
        let hint = FallbackHint::default();

        let (a, b, c) = tokio::join!(
            h.service.fetch("u1", &hint),
            h.service.fetch("u1", &hint),
            h.service.fetch("u1", &hint),
        );

        assert_eq!(h.endpoint.calls(), 1);
        let a = a.unwrap();
        assert_eq!(a, b.unwrap());
        assert_eq!(a, c.unwrap());
        assert_eq!(h.service.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_joined_callers_share_the_error() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(RemoteResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "",
        ))])
        .with_delay(Duration::from_millis(50));
        let h = harness(StubAuth::signed_in("t"), endpoint);
        let hint = FallbackHint::default();

        let (a, b) = tokio::join!(h.service.fetch("u1", &hint), h.service.fetch("u1", &hint));

        let expected = Err(FetchError::FetchFailed(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(a, expected);
        assert_eq!(b, expected);
        assert_eq!(h.endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_refreshes_token_once_on_rejection() {
        let auth = StubAuth::signed_in("stale").with_refresh(Ok(AuthSession::new("fresh")));
        let endpoint = ScriptedEndpoint::new(vec![
            Ok(RemoteResponse::new(StatusCode::UNAUTHORIZED, "")),
            Ok(profile_body("u1")),
        ]);
        let h = harness(auth, endpoint);

        let fetched = h.service.fetch("u1", &FallbackHint::default()).await.unwrap();

        assert_eq!(fetched.id.as_str(), "u1");
        assert_eq!(h.auth.refresh_calls(), 1);
        assert_eq!(h.endpoint.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_authentication_failed() {
        let auth = StubAuth::signed_in("stale").with_refresh(Err(AuthError::Rejected(StatusCode::BAD_REQUEST)));
        let endpoint =
            ScriptedEndpoint::new(vec![Ok(RemoteResponse::new(StatusCode::UNAUTHORIZED, ""))]);
        let h = harness(auth, endpoint);

        let err = h.service.fetch("u1", &FallbackHint::default()).await.unwrap_err();

        assert_eq!(err, FetchError::AuthenticationFailed);
        assert!(err.requires_login());
        assert_eq!(h.auth.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_session_fails_fast() {
        let h = harness(StubAuth::signed_out(), ScriptedEndpoint::new(vec![]));

        let result = h.service.fetch("u1", &FallbackHint::default()).await;

        assert_eq!(result, Err(FetchError::NoAuthToken));
        assert_eq!(h.endpoint.calls(), 0);
        assert_eq!(h.service.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let endpoint = ScriptedEndpoint::new(vec![
            Err(NetworkError::new("connection reset")),
            Ok(profile_body("u1")),
        ]);
        let h = harness(StubAuth::signed_in("t"), endpoint);

        let first = h.service.fetch("u1", &FallbackHint::default()).await;
        assert!(matches!(first, Err(FetchError::Network(_))));

        let second = h.service.fetch("u1", &FallbackHint::default()).await;
        assert!(second.is_ok());
        assert_eq!(h.endpoint.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_uses_fallback_and_caches_it() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(RemoteResponse::ok("[]"))]);
        let h = harness(StubAuth::signed_in("t"), endpoint);
        let hint = FallbackHint::email("new@example.com");

        let fetched = h.service.fetch("new-user", &hint).await.unwrap();
        assert_eq!(fetched.email.as_deref(), Some("new@example.com"));

        let again = h.service.fetch("new-user", &hint).await.unwrap();
        assert_eq!(again, fetched);
        assert_eq!(h.endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_without_hint_is_not_found() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(RemoteResponse::ok("[]"))]);
        let h = harness(StubAuth::signed_in("t"), endpoint);

        let result = h.service.fetch("ghost", &FallbackHint::default()).await;

        assert_eq!(result, Err(FetchError::NotFound("ghost".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_rejects_pending_callers() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(profile_body("u1"))])
            .with_delay(Duration::from_secs(10));
        let h = harness(StubAuth::signed_in("t"), endpoint);
        let service = Arc::new(h.service);

        let waiter = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.fetch("u1", &FallbackHint::default()).await })
        };
        while service.pending_count() == 0 {
            tokio::task::yield_now().await;
        }

        service.destroy();

        assert_eq!(waiter.await.unwrap(), Err(FetchError::Destroyed));
        assert_eq!(service.pending_count(), 0);
        assert_eq!(
            service.fetch("u1", &FallbackHint::default()).await,
            Err(FetchError::Destroyed)
        );
    }

    #[tokio::test]
    async fn test_panicking_request_releases_pending_entry() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(profile_body("u1"))]).panicking_once();
        let h = harness(StubAuth::signed_in("t"), endpoint);
        let hint = FallbackHint::default();

        let first = h.service.fetch("u1", &hint).await;
        assert!(matches!(first, Err(FetchError::Destroyed)));
        assert_eq!(h.service.pending_count(), 0);

        let second = h.service.fetch("u1", &hint).await.unwrap();
        assert_eq!(second, profile("u1"));
        assert_eq!(h.endpoint.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_uses_cache_ttl_without_entity_override() {
        let mut config = Config::default();
        config.cache.default_ttl_ms = 1_000;
        config.fetch.entity_ttl_ms = None;
        assert_eq!(config.entity_cache().default_ttl(), Duration::from_millis(1_000));

        config.fetch.entity_ttl_ms = Some(50);
        assert_eq!(config.entity_cache().default_ttl(), Duration::from_millis(50));

        let endpoint = Arc::new(ScriptedEndpoint::new(vec![
            Ok(profile_body("u1")),
            Ok(profile_body("u1")),
        ]));
        let service: FetchService<Profile> = FetchService::from_config(
            Arc::new(StubAuth::signed_in("t")),
            endpoint.clone(),
            Arc::new(InMemoryStore::<Profile>::default()),
            &config,
        );

        service.fetch("u1", &FallbackHint::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        service.fetch("u1", &FallbackHint::default()).await.unwrap();
        assert_eq!(endpoint.calls(), 2);
    }

    #[tokio::test]
    async fn test_successful_update_invalidates_cache() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(profile_body("u1")), Ok(profile_body("u1"))]);
        let h = harness(StubAuth::signed_in("t"), endpoint);
        h.service.fetch("u1", &FallbackHint::default()).await.unwrap();

        let patch = ProfilePatch {
            full_name: Some("Ada Lovelace".to_string()),
            avatar_url: None,
        };
        let updated = h.service.update("u1", &patch).await.unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Ada Lovelace"));

        h.service.fetch("u1", &FallbackHint::default()).await.unwrap();
        assert_eq!(h.endpoint.calls(), 2, "update must force a refetch");
    }

    #[tokio::test]
    async fn test_failed_update_keeps_cache() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(profile_body("u1"))]);
        let h = harness(StubAuth::signed_in("t"), endpoint);
        h.service.fetch("u1", &FallbackHint::default()).await.unwrap();

        let blank = ProfilePatch {
            full_name: Some("  ".to_string()),
            avatar_url: None,
        };
        let err = h.service.update("u1", &blank).await.unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidPatch(_)));

        h.service.fetch("u1", &FallbackHint::default()).await.unwrap();
        assert_eq!(h.endpoint.calls(), 1);
        assert!(h.store.get("u1").await.unwrap().unwrap().full_name.is_none());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(profile_body("u1")), Ok(profile_body("u1"))]);
        let h = harness(StubAuth::signed_in("t"), endpoint);

        h.service.fetch("u1", &FallbackHint::default()).await.unwrap();
        h.service.clear_cache();
        h.service.fetch("u1", &FallbackHint::default()).await.unwrap();

        assert_eq!(h.endpoint.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_value_expires_after_ttl() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(profile_body("u1")), Ok(profile_body("u1"))]);
        let h = harness(StubAuth::signed_in("t"), endpoint);

        h.service.fetch("u1", &FallbackHint::default()).await.unwrap();
        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        h.service.fetch("u1", &FallbackHint::default()).await.unwrap();

        assert_eq!(h.endpoint.calls(), 2);
    }

    #[test]
    fn test_decode_body_shapes() {
        let hint = FallbackHint::default();
        let row = serde_json::to_string(&profile("u1")).unwrap();

        let from_object: Profile = decode_body("u1", &hint, &row).unwrap();
        let from_array: Profile = decode_body("u1", &hint, &format!("[{row}]")).unwrap();
        assert_eq!(from_object, from_array);

        assert_eq!(
            decode_body::<Profile>("u1", &hint, "null"),
            Err(FetchError::NotFound("u1".to_string()))
        );
        assert!(matches!(
            decode_body::<Profile>("u1", &hint, &format!("[{row},{row}]")),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            decode_body::<Profile>("u1", &hint, "<html>"),
            Err(FetchError::Decode(_))
        ));
    }
}
