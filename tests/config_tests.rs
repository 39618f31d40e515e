//! Configuration layering: environment first, YAML file second.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use osdu_mcp_auth::auth::StaticProbe;
use osdu_mcp_auth::{
    AccessToken, AuthConfig, AuthenticationMode, Clock, ConfigError, ConfigManager,
    CredentialResolver, CredentialSource, EnvSnapshot, LoggingConfig, ManualClock, Result,
};

fn write_config(dir: &tempfile::TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_env_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "auth:\n  mode: gcp\n  refresh_margin: 600\nlogging:\n  enabled: true\n  level: debug\n",
    );

    let env = EnvSnapshot::from_pairs([("OSDU_MCP_AUTH_MODE", "azure")]);
    let manager = ConfigManager::with_file(env, &path).unwrap();
    let auth = AuthConfig::from_config(&manager).unwrap();

    assert_eq!(auth.mode_override.as_deref(), Some("azure"));
    assert_eq!(auth.refresh_margin, StdDuration::from_secs(600));

    let logging = LoggingConfig::from_config(&manager).unwrap();
    assert!(logging.enabled);
    assert_eq!(logging.level, "debug");
}

#[test]
fn test_missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let manager =
        ConfigManager::with_file(EnvSnapshot::empty(), dir.path().join("absent.yaml")).unwrap();
    assert!(manager.get("auth", "mode").is_none());

    let err = manager.get_required("server", "url").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { ref env_var, .. } if env_var == "OSDU_MCP_SERVER_URL"));
}

#[test]
fn test_invalid_yaml_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "auth: [unclosed\n");
    assert!(matches!(
        ConfigManager::with_file(EnvSnapshot::empty(), &path),
        Err(ConfigError::Yaml(_))
    ));
}

#[test]
fn test_negative_margin_rejected() {
    let env = EnvSnapshot::from_pairs([("OSDU_MCP_AUTH_REFRESH_MARGIN", "-5")]);
    assert!(matches!(
        AuthConfig::from_snapshot(&env),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn test_config_debug_redacts_secrets() {
    let env = EnvSnapshot::from_pairs([
        ("OSDU_MCP_USER_TOKEN", "eyJ.secret.token"),
        ("AZURE_CLIENT_SECRET", "azure-secret-value"),
        ("AWS_SECRET_ACCESS_KEY", "aws-secret-value"),
    ]);
    let auth = AuthConfig::from_snapshot(&env).unwrap();
    let debug = format!("{:?}", auth);

    assert!(!debug.contains("eyJ.secret.token"));
    assert!(!debug.contains("azure-secret-value"));
    assert!(!debug.contains("aws-secret-value"));
    assert!(!format!("{:?}", env).contains("aws-secret-value"));
}

struct OneHourSource {
    clock: ManualClock,
    calls: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl CredentialSource for OneHourSource {
    fn name(&self) -> &str {
        "one_hour"
    }

    fn mode(&self) -> AuthenticationMode {
        AuthenticationMode::Aws
    }

    async fn fetch(&self) -> Result<AccessToken> {
        let n = self
            .calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        Ok(AccessToken::new(
            format!("tok-{}", n),
            Some(self.clock.now() + Duration::hours(1)),
        ))
    }
}

#[tokio::test]
async fn test_yaml_mode_and_margin_drive_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "auth:\n  mode: aws\n  refresh_margin: 900\n");
    let manager = ConfigManager::with_file(EnvSnapshot::empty(), &path).unwrap();

    let start = DateTime::<Utc>::from_timestamp(1_750_000_000, 0).unwrap();
    let clock = ManualClock::new(start);
    let source = Arc::new(OneHourSource {
        clock: clock.clone(),
        calls: Default::default(),
    });

    let resolver = CredentialResolver::builder()
        .config(manager)
        .probe(Arc::new(StaticProbe::new(false, false)))
        .clock(Arc::new(clock.clone()))
        .source_for(AuthenticationMode::Aws, source)
        .build()
        .await
        .unwrap();

    assert_eq!(resolver.mode(), AuthenticationMode::Aws);
    assert_eq!(resolver.get_access_token().await.unwrap(), "tok-1");

    clock.advance(Duration::minutes(44));
    assert_eq!(resolver.get_access_token().await.unwrap(), "tok-1");

    clock.advance(Duration::minutes(2));
    assert_eq!(resolver.get_access_token().await.unwrap(), "tok-2");
}
