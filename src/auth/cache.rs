//! Token cache with single-flight refresh.
//!
//! At most one fetch runs against the credential source at a time. Callers
//! that arrive while it runs wait for the same result. The fetch runs on its
//! own task, so a caller that gives up does not abort it and the token still
//! lands in the cache.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use super::credential::{AccessToken, CachedToken};
use super::{Clock, CredentialSource, SystemClock};
use crate::config::DEFAULT_REFRESH_MARGIN;
use crate::observability::AuthMetrics;
use crate::{Error, Result};

type SharedFetch = Shared<BoxFuture<'static, Result<AccessToken>>>;

#[derive(Default)]
struct CacheState {
    cached: Option<CachedToken>,
    in_flight: Option<SharedFetch>,
    /// Bumped for every fetch, on invalidate and on close; stale fetches do
    /// not write back.
    generation: u64,
    closed: bool,
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Caches the token of one [`CredentialSource`].
pub struct TokenCache {
    source: Arc<dyn CredentialSource>,
    state: Arc<Mutex<CacheState>>,
    clock: Arc<dyn Clock>,
    margin: Duration,
    metrics: Arc<AuthMetrics>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(CacheState::default())),
            clock: Arc::new(SystemClock),
            margin: to_chrono(DEFAULT_REFRESH_MARGIN),
            metrics: Arc::new(AuthMetrics::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Refresh this long before the provider-declared expiry.
    pub fn with_margin(mut self, margin: StdDuration) -> Self {
        self.margin = to_chrono(margin);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<AuthMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn source(&self) -> &Arc<dyn CredentialSource> {
        &self.source
    }

    pub fn metrics(&self) -> &Arc<AuthMetrics> {
        &self.metrics
    }

    /// Expiry of the cached token, if one is held.
    pub fn cached_expires_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.state)
            .cached
            .as_ref()
            .and_then(|c| c.token().expires_at())
    }

    /// Return the cached token or fetch a new one.
    pub async fn get_token(&self) -> Result<AccessToken> {
        let fetch = {
            let mut state = lock(&self.state);
            if state.closed {
                return Err(Error::Closed);
            }

            if let Some(cached) = &state.cached
                && cached.is_fresh(self.clock.now())
            {
                self.metrics.record_cache_hit();
                return Ok(cached.token().clone());
            }

            match state.in_flight.clone() {
                Some(fetch) => fetch,
                None => self.start_fetch(&mut state),
            }
        };

        fetch.await
    }

    /// Drop the cached token so the next call fetches. A fetch already
    /// running still answers its waiters but no longer fills the cache.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        state.cached = None;
        state.in_flight = None;
        state.generation += 1;
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Clear state and release the source. Later calls are no-ops.
    pub async fn close(&self) {
        {
            let mut state = lock(&self.state);
            if state.closed {
                return;
            }
            state.closed = true;
            state.cached = None;
            state.in_flight = None;
            state.generation += 1;
        }

        self.source.close().await;
        tracing::debug!(source = self.source.name(), "Token cache closed");
    }

    fn start_fetch(&self, state: &mut CacheState) -> SharedFetch {
        state.generation += 1;
        let generation = state.generation;
        self.metrics.record_fetch();

        let source = Arc::clone(&self.source);
        let shared = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let metrics = Arc::clone(&self.metrics);
        let margin = self.margin;

        let task = tokio::spawn(async move {
            tracing::debug!(source = source.name(), "Fetching token");
            let result = source.fetch().await;

            match &result {
                Ok(token) if token.near_expiry() => {
                    let expires_in = token
                        .expires_in(clock.now())
                        .map(|d| d.num_seconds())
                        .unwrap_or_default();
                    tracing::warn!(
                        source = source.name(),
                        expires_in_secs = expires_in,
                        "Token expires soon and cannot be refreshed automatically"
                    );
                    metrics.record_near_expiry_warning();
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "Token fetch failed");
                    metrics.record_refresh_failure();
                }
            }

            let mut state = lock(&shared);
            if state.closed {
                return Err(Error::Closed);
            }
            if state.generation == generation {
                state.cached = match &result {
                    Ok(token) => Some(CachedToken::new(
                        token.clone(),
                        clock.now(),
                        margin,
                        source.supports_refresh(),
                    )),
                    Err(_) => None,
                };
                state.in_flight = None;
            }
            drop(state);

            result
        });

        let shared = Arc::clone(&self.state);
        let fetch = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    let mut state = lock(&shared);
                    if state.generation == generation {
                        state.in_flight = None;
                    }
                    Err(Error::auth(format!("token refresh task failed: {}", e)))
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(fetch.clone());
        fetch
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("TokenCache")
            .field("source", &self.source.name())
            .field("cached", &state.cached)
            .field("refreshing", &state.in_flight.is_some())
            .field("closed", &state.closed)
            .finish()
    }
}

fn to_chrono(margin: StdDuration) -> Duration {
    Duration::from_std(margin).unwrap_or_else(|_| Duration::seconds(i64::from(u32::MAX)))
}
