//! Authentication mode and environment-based detection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::discovery::{DiscoveryProbe, NoDiscovery};
use crate::config::AuthConfig;
use crate::{Error, Result};

/// Identity-provider family used by a resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationMode {
    /// Pre-supplied bearer token from `OSDU_MCP_USER_TOKEN`.
    UserToken,
    Azure,
    Aws,
    Gcp,
}

impl AuthenticationMode {
    pub const ALL: [AuthenticationMode; 4] = [Self::UserToken, Self::Azure, Self::Aws, Self::Gcp];

    /// Value accepted by `OSDU_MCP_AUTH_MODE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserToken => "user_token",
            Self::Azure => "azure",
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }

    /// Cargo feature providing this mode's SDK, if any.
    pub fn feature(&self) -> Option<&'static str> {
        match self {
            Self::UserToken => None,
            Self::Azure => Some("azure"),
            Self::Aws => Some("aws"),
            Self::Gcp => Some("gcp"),
        }
    }
}

impl fmt::Display for AuthenticationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserToken => "User token",
            Self::Azure => "Azure",
            Self::Aws => "AWS",
            Self::Gcp => "GCP",
        })
    }
}

impl FromStr for AuthenticationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| Error::InvalidModeOverride {
                value: s.to_string(),
            })
    }
}

/// Picks exactly one [`AuthenticationMode`] from configuration.
///
/// Priority, first match wins:
/// 1. `OSDU_MCP_USER_TOKEN`
/// 2. `AZURE_CLIENT_ID` or `AZURE_TENANT_ID`
/// 3. `AWS_ACCESS_KEY_ID` or `AWS_PROFILE`
/// 4. `GOOGLE_APPLICATION_CREDENTIALS`
/// 5. AWS ambient discovery (IAM role, SSO)
/// 6. GCP ambient discovery (gcloud, metadata service)
///
/// `OSDU_MCP_AUTH_MODE` short-circuits all of the above.
#[derive(Clone)]
pub struct ModeDetector {
    probe: Arc<dyn DiscoveryProbe>,
}

impl ModeDetector {
    pub fn new(probe: Arc<dyn DiscoveryProbe>) -> Self {
        Self { probe }
    }

    /// Detector that skips the ambient probes (steps 5 and 6).
    pub fn without_discovery() -> Self {
        Self::new(Arc::new(NoDiscovery))
    }

    /// Validate the explicit override, if one is configured.
    pub fn parse_override(config: &AuthConfig) -> Result<Option<AuthenticationMode>> {
        match config.mode_override.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some),
        }
    }

    /// Steps 1-4: decisions based only on explicitly configured variables.
    pub fn detect_explicit(config: &AuthConfig) -> Option<AuthenticationMode> {
        if config.user_token.is_some() {
            return Some(AuthenticationMode::UserToken);
        }
        if config.azure.client_id.is_some() || config.azure.tenant_id.is_some() {
            return Some(AuthenticationMode::Azure);
        }
        if config.aws.access_key_id.is_some() || config.aws.profile.is_some() {
            return Some(AuthenticationMode::Aws);
        }
        if config.gcp.credentials_path.is_some() {
            return Some(AuthenticationMode::Gcp);
        }
        None
    }

    pub async fn detect(&self, config: &AuthConfig) -> Result<AuthenticationMode> {
        if let Some(mode) = Self::parse_override(config)? {
            tracing::info!(mode = mode.as_str(), "Authentication mode set by override");
            return Ok(mode);
        }

        if let Some(mode) = Self::detect_explicit(config) {
            tracing::info!(mode = mode.as_str(), "Authentication mode detected");
            return Ok(mode);
        }

        if self.probe.aws_available().await {
            tracing::info!(mode = "aws", "Authentication mode auto-discovered");
            return Ok(AuthenticationMode::Aws);
        }

        if self.probe.gcp_available().await {
            tracing::info!(mode = "gcp", "Authentication mode auto-discovered");
            return Ok(AuthenticationMode::Gcp);
        }

        Err(Error::NoCredentialsFound {
            guidance: NO_CREDENTIALS_GUIDANCE.to_string(),
        })
    }
}

impl Default for ModeDetector {
    fn default() -> Self {
        Self::without_discovery()
    }
}

impl fmt::Debug for ModeDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeDetector").finish_non_exhaustive()
    }
}

const NO_CREDENTIALS_GUIDANCE: &str = "Set up one of:\n\n\
  Manual Token (Highest Priority):\n\
    export OSDU_MCP_USER_TOKEN=your-bearer-token\n\n\
  Azure:\n\
    az login\n\
    OR export AZURE_CLIENT_ID=... AZURE_TENANT_ID=...\n\n\
  AWS:\n\
    aws sso login\n\
    OR export AWS_ACCESS_KEY_ID=... AWS_SECRET_ACCESS_KEY=...\n\n\
  GCP:\n\
    gcloud auth application-default login\n\
    OR export GOOGLE_APPLICATION_CREDENTIALS=/path/to/key.json\n\n\
  To force a provider: export OSDU_MCP_AUTH_MODE=user_token|azure|aws|gcp";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::discovery::StaticProbe;
    use crate::config::EnvSnapshot;

    fn config(pairs: &[(&str, &str)]) -> AuthConfig {
        AuthConfig::from_snapshot(&EnvSnapshot::from_pairs(pairs.iter().copied())).unwrap()
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(
            "user_token".parse::<AuthenticationMode>().unwrap(),
            AuthenticationMode::UserToken
        );
        assert_eq!(
            "USER-TOKEN".parse::<AuthenticationMode>().unwrap(),
            AuthenticationMode::UserToken
        );
        assert_eq!(
            " Azure ".parse::<AuthenticationMode>().unwrap(),
            AuthenticationMode::Azure
        );
        assert!(matches!(
            "okta".parse::<AuthenticationMode>(),
            Err(Error::InvalidModeOverride { value }) if value == "okta"
        ));
    }

    #[test]
    fn test_mode_serde_names() {
        let json = serde_json::to_string(&AuthenticationMode::UserToken).unwrap();
        assert_eq!(json, "\"user_token\"");
        let mode: AuthenticationMode = serde_json::from_str("\"gcp\"").unwrap();
        assert_eq!(mode, AuthenticationMode::Gcp);
    }

    #[tokio::test]
    async fn test_each_signal_in_isolation() {
        let detector = ModeDetector::without_discovery();
        let cases = [
            ("OSDU_MCP_USER_TOKEN", "a.b.c", AuthenticationMode::UserToken),
            ("AZURE_CLIENT_ID", "client", AuthenticationMode::Azure),
            ("AZURE_TENANT_ID", "tenant", AuthenticationMode::Azure),
            ("AWS_ACCESS_KEY_ID", "AKIA", AuthenticationMode::Aws),
            ("AWS_PROFILE", "dev", AuthenticationMode::Aws),
            (
                "GOOGLE_APPLICATION_CREDENTIALS",
                "/tmp/key.json",
                AuthenticationMode::Gcp,
            ),
        ];

        for (var, value, expected) in cases {
            let mode = detector.detect(&config(&[(var, value)])).await.unwrap();
            assert_eq!(mode, expected, "{} should select {:?}", var, expected);
        }
    }

    #[tokio::test]
    async fn test_priority_order() {
        let detector = ModeDetector::without_discovery();

        let all = config(&[
            ("OSDU_MCP_USER_TOKEN", "a.b.c"),
            ("AZURE_CLIENT_ID", "client"),
            ("AWS_PROFILE", "dev"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/key.json"),
        ]);
        assert_eq!(
            detector.detect(&all).await.unwrap(),
            AuthenticationMode::UserToken
        );

        let no_token = config(&[
            ("AZURE_TENANT_ID", "tenant"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/key.json"),
        ]);
        assert_eq!(
            detector.detect(&no_token).await.unwrap(),
            AuthenticationMode::Azure
        );

        let aws_gcp = config(&[
            ("AWS_PROFILE", "dev"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/key.json"),
        ]);
        assert_eq!(
            detector.detect(&aws_gcp).await.unwrap(),
            AuthenticationMode::Aws
        );
    }

    #[tokio::test]
    async fn test_empty_token_is_ignored() {
        let detector = ModeDetector::without_discovery();
        let cfg = config(&[("OSDU_MCP_USER_TOKEN", ""), ("AWS_PROFILE", "dev")]);
        assert_eq!(detector.detect(&cfg).await.unwrap(), AuthenticationMode::Aws);
    }

    #[tokio::test]
    async fn test_override_wins() {
        let detector = ModeDetector::new(Arc::new(StaticProbe::new(true, true)));
        let cfg = config(&[
            ("OSDU_MCP_USER_TOKEN", "a.b.c"),
            ("AZURE_CLIENT_ID", "client"),
            ("OSDU_MCP_AUTH_MODE", "gcp"),
        ]);
        assert_eq!(detector.detect(&cfg).await.unwrap(), AuthenticationMode::Gcp);
    }

    #[tokio::test]
    async fn test_invalid_override_fails_before_probing() {
        let probe = Arc::new(StaticProbe::new(true, true));
        let detector = ModeDetector::new(probe.clone());
        let cfg = config(&[("OSDU_MCP_AUTH_MODE", "kerberos"), ("AWS_PROFILE", "dev")]);

        assert!(matches!(
            detector.detect(&cfg).await,
            Err(Error::InvalidModeOverride { .. })
        ));
        assert_eq!(probe.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_override_reports_value_as_written() {
        let detector = ModeDetector::without_discovery();
        for raw in ["1", "0", "yes", "2.50"] {
            let cfg = config(&[("OSDU_MCP_AUTH_MODE", raw)]);
            assert!(matches!(
                detector.detect(&cfg).await,
                Err(Error::InvalidModeOverride { ref value }) if value == raw
            ));
        }
    }

    #[tokio::test]
    async fn test_ambient_discovery_order() {
        let both = ModeDetector::new(Arc::new(StaticProbe::new(true, true)));
        assert_eq!(
            both.detect(&config(&[])).await.unwrap(),
            AuthenticationMode::Aws
        );

        let gcp_only = ModeDetector::new(Arc::new(StaticProbe::new(false, true)));
        assert_eq!(
            gcp_only.detect(&config(&[])).await.unwrap(),
            AuthenticationMode::Gcp
        );
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let detector = ModeDetector::new(Arc::new(StaticProbe::new(false, false)));
        let err = detector.detect(&config(&[])).await.unwrap_err();
        assert!(matches!(err, Error::NoCredentialsFound { .. }));
        assert!(err.to_string().contains("OSDU_MCP_USER_TOKEN"));
        assert!(err.is_configuration_error());
    }
}
