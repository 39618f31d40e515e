//! Credential resolver: mode detection plus a cached token source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::discovery::{AmbientProbe, DiscoveryProbe};
use super::providers::{ManualTokenSource, build_source};
use super::{AuthenticationMode, Clock, CredentialSource, ModeDetector, SystemClock, TokenCache};
use crate::Result;
use crate::config::{AuthConfig, ConfigManager, EnvSnapshot, check_refresh_margin};
use crate::observability::MetricsSnapshot;

/// Hands out bearer tokens for the OSDU platform.
///
/// The mode is detected once at construction and never re-detected. Every
/// OSDU client shares one resolver; concurrent callers share one refresh.
pub struct CredentialResolver {
    mode: AuthenticationMode,
    cache: TokenCache,
}

impl CredentialResolver {
    /// Detect the mode from the process environment and `config.yaml`.
    pub async fn from_env() -> Result<Self> {
        Self::builder().build().await
    }

    pub async fn new(config: AuthConfig) -> Result<Self> {
        Self::builder().auth_config(config).build().await
    }

    pub fn builder() -> CredentialResolverBuilder {
        CredentialResolverBuilder::default()
    }

    pub fn mode(&self) -> AuthenticationMode {
        self.mode
    }

    pub fn source_name(&self) -> &str {
        self.cache.source().name()
    }

    /// Return a valid bearer token, refreshing it if needed.
    pub async fn get_access_token(&self) -> Result<String> {
        let token = self.cache.get_token().await?;
        Ok(token.secret().to_string())
    }

    /// Whether a token can currently be produced.
    pub async fn validate_token(&self) -> bool {
        match self.cache.get_token().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(mode = self.mode.as_str(), error = %e, "Token validation failed");
                false
            }
        }
    }

    /// Drop the cached token, e.g. after the platform rejected it.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.cache.metrics().snapshot()
    }

    /// Release provider resources. Safe to call more than once.
    pub async fn close(&self) {
        self.cache.close().await;
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("mode", &self.mode)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Builder for [`CredentialResolver`].
#[derive(Default)]
pub struct CredentialResolverBuilder {
    env: Option<EnvSnapshot>,
    config: Option<ConfigManager>,
    auth_config: Option<AuthConfig>,
    probe: Option<Arc<dyn DiscoveryProbe>>,
    clock: Option<Arc<dyn Clock>>,
    refresh_margin: Option<Duration>,
    source: Option<Arc<dyn CredentialSource>>,
    mode_sources: HashMap<AuthenticationMode, Arc<dyn CredentialSource>>,
}

impl CredentialResolverBuilder {
    /// Use this snapshot instead of the process environment.
    pub fn env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    /// Use this configuration (environment snapshot plus file layer).
    pub fn config(mut self, config: ConfigManager) -> Self {
        self.config = Some(config);
        self
    }

    pub fn auth_config(mut self, config: AuthConfig) -> Self {
        self.auth_config = Some(config);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn DiscoveryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Must be under an hour; `build` rejects longer margins.
    pub fn refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = Some(margin);
        self
    }

    /// Skip detection and use this source; the mode is taken from it.
    pub fn source(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use `source` if detection selects `mode`.
    pub fn source_for(
        mut self,
        mode: AuthenticationMode,
        source: Arc<dyn CredentialSource>,
    ) -> Self {
        self.mode_sources.insert(mode, source);
        self
    }

    pub async fn build(mut self) -> Result<CredentialResolver> {
        let live_env = self.env.is_none() && self.config.is_none() && self.auth_config.is_none();
        let clock: Arc<dyn Clock> = match self.clock.take() {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        let manager = match (self.config.take(), self.env.take()) {
            (Some(config), _) => config,
            (None, Some(env)) => ConfigManager::from_env(env),
            (None, None) if self.auth_config.is_some() => {
                ConfigManager::from_env(EnvSnapshot::empty())
            }
            (None, None) => ConfigManager::load()?,
        };
        let auth = match self.auth_config.take() {
            Some(auth) => auth,
            None => AuthConfig::from_config(&manager)?,
        };
        let margin = check_refresh_margin(self.refresh_margin.unwrap_or(auth.refresh_margin))?;

        let (mode, source) = match self.source.take() {
            Some(source) => (source.mode(), source),
            None => {
                let probe: Arc<dyn DiscoveryProbe> = match self.probe.take() {
                    Some(probe) => probe,
                    None => Arc::new(AmbientProbe::new(manager.env().clone())),
                };
                let mode = ModeDetector::new(probe).detect(&auth).await?;

                let source: Arc<dyn CredentialSource> = match self.mode_sources.remove(&mode) {
                    Some(source) => source,
                    None if mode == AuthenticationMode::UserToken && live_env => {
                        Arc::new(ManualTokenSource::from_env().with_clock(clock.clone()))
                    }
                    None => build_source(mode, &auth, clock.clone())?,
                };
                (mode, source)
            }
        };

        tracing::info!(
            mode = mode.as_str(),
            source = source.name(),
            refresh_margin_secs = margin.as_secs(),
            "Credential resolver initialized"
        );

        let cache = TokenCache::new(source).with_clock(clock).with_margin(margin);
        Ok(CredentialResolver { mode, cache })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::auth::discovery::StaticProbe;
    use crate::auth::{AccessToken, ManualClock};
    use crate::{Error, Result};

    struct StubSource {
        mode: AuthenticationMode,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(mode: AuthenticationMode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CredentialSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        fn mode(&self) -> AuthenticationMode {
            self.mode
        }

        async fn fetch(&self) -> Result<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AccessToken::new(format!("stub-{}", n), None))
        }
    }

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_detected_mode_uses_registered_source() {
        let stub = StubSource::new(AuthenticationMode::Gcp);
        let resolver = CredentialResolver::builder()
            .env(EnvSnapshot::from_pairs([(
                "GOOGLE_APPLICATION_CREDENTIALS",
                "/tmp/key.json",
            )]))
            .probe(Arc::new(StaticProbe::new(false, false)))
            .source_for(AuthenticationMode::Gcp, stub.clone())
            .build()
            .await
            .unwrap();

        assert_eq!(resolver.mode(), AuthenticationMode::Gcp);
        assert_eq!(resolver.source_name(), "stub");
        assert_eq!(resolver.get_access_token().await.unwrap(), "stub-1");
        assert!(resolver.validate_token().await);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_explicit_source_skips_detection() {
        let probe = Arc::new(StaticProbe::new(true, true));
        let resolver = CredentialResolver::builder()
            .env(EnvSnapshot::empty())
            .probe(probe.clone())
            .source(StubSource::new(AuthenticationMode::Azure))
            .build()
            .await
            .unwrap();

        assert_eq!(resolver.mode(), AuthenticationMode::Azure);
        assert_eq!(probe.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let result = CredentialResolver::builder()
            .env(EnvSnapshot::empty())
            .probe(Arc::new(StaticProbe::new(false, false)))
            .build()
            .await;
        assert!(matches!(result, Err(Error::NoCredentialsFound { .. })));
    }

    #[tokio::test]
    async fn test_manual_token_from_config() {
        let token = crate::auth::jwt::encode_unsigned(
            &serde_json::json!({"exp": start().timestamp() + 3600}),
        );
        let resolver = CredentialResolver::builder()
            .auth_config(AuthConfig {
                user_token: Some(token.clone().into()),
                ..AuthConfig::default()
            })
            .clock(Arc::new(ManualClock::new(start())))
            .build()
            .await
            .unwrap();

        assert_eq!(resolver.mode(), AuthenticationMode::UserToken);
        assert_eq!(resolver.source_name(), "user_token");
        assert_eq!(resolver.get_access_token().await.unwrap(), token);
    }

    #[tokio::test]
    async fn test_refresh_margin_bound() {
        let ok = CredentialResolver::builder()
            .env(EnvSnapshot::empty())
            .refresh_margin(Duration::from_secs(3599))
            .source(StubSource::new(AuthenticationMode::Aws))
            .build()
            .await;
        assert!(ok.is_ok());

        for secs in [3600, u64::MAX / 2] {
            let result = CredentialResolver::builder()
                .env(EnvSnapshot::empty())
                .refresh_margin(Duration::from_secs(secs))
                .source(StubSource::new(AuthenticationMode::Aws))
                .build()
                .await;
            assert!(matches!(result, Err(Error::Config(ref msg)) if msg.contains("refresh_margin")));
        }

        let result = CredentialResolver::builder()
            .auth_config(AuthConfig::default().with_refresh_margin(Duration::from_secs(7200)))
            .source(StubSource::new(AuthenticationMode::Aws))
            .build()
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_invalidate_and_close() {
        let stub = StubSource::new(AuthenticationMode::Aws);
        let resolver = CredentialResolver::builder()
            .env(EnvSnapshot::empty())
            .source(stub.clone())
            .build()
            .await
            .unwrap();

        assert_eq!(resolver.get_access_token().await.unwrap(), "stub-1");
        resolver.invalidate();
        assert_eq!(resolver.get_access_token().await.unwrap(), "stub-2");

        resolver.close().await;
        resolver.close().await;
        assert!(matches!(
            resolver.get_access_token().await,
            Err(Error::Closed)
        ));
        assert!(!resolver.validate_token().await);
        assert_eq!(resolver.metrics().fetches, 2);
    }
}
