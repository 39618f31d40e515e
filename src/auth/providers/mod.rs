//! Credential source implementations.

pub mod aws;
pub mod azure;
mod chain;
pub mod gcp;
mod manual;

use std::sync::Arc;

pub use chain::{ChainSource, CredentialMethod, UnavailableMethod};
pub use manual::ManualTokenSource;

use super::{AuthenticationMode, Clock, CredentialSource};
use crate::config::AuthConfig;
use crate::{Error, Result};

/// Build the credential source for `mode`.
///
/// Cloud modes fail with [`Error::FeatureDisabled`] when their SDK feature
/// was not compiled in.
pub fn build_source(
    mode: AuthenticationMode,
    config: &AuthConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn CredentialSource>> {
    match mode {
        AuthenticationMode::UserToken => {
            let token = config.user_token.clone().ok_or_else(|| {
                Error::config("OSDU_MCP_USER_TOKEN must be set for user_token authentication")
            })?;
            Ok(Arc::new(ManualTokenSource::new(token).with_clock(clock)))
        }
        AuthenticationMode::Azure => azure_source(config),
        AuthenticationMode::Aws => aws_source(config),
        AuthenticationMode::Gcp => gcp_source(config),
    }
}

#[cfg(not(all(feature = "aws", feature = "gcp", feature = "azure")))]
fn feature_disabled(mode: AuthenticationMode) -> Error {
    Error::FeatureDisabled {
        mode,
        feature: mode.feature().unwrap_or("default"),
    }
}

#[cfg(feature = "azure")]
fn azure_source(config: &AuthConfig) -> Result<Arc<dyn CredentialSource>> {
    Ok(Arc::new(azure::build(config)?))
}

#[cfg(not(feature = "azure"))]
fn azure_source(config: &AuthConfig) -> Result<Arc<dyn CredentialSource>> {
    azure::resolve_scope(config)?;
    Err(feature_disabled(AuthenticationMode::Azure))
}

#[cfg(feature = "aws")]
fn aws_source(config: &AuthConfig) -> Result<Arc<dyn CredentialSource>> {
    Ok(Arc::new(aws::build(config)?))
}

#[cfg(not(feature = "aws"))]
fn aws_source(_config: &AuthConfig) -> Result<Arc<dyn CredentialSource>> {
    Err(feature_disabled(AuthenticationMode::Aws))
}

#[cfg(feature = "gcp")]
fn gcp_source(config: &AuthConfig) -> Result<Arc<dyn CredentialSource>> {
    Ok(Arc::new(gcp::build(config)?))
}

#[cfg(not(feature = "gcp"))]
fn gcp_source(_config: &AuthConfig) -> Result<Arc<dyn CredentialSource>> {
    Err(feature_disabled(AuthenticationMode::Gcp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SystemClock;
    use crate::config::EnvSnapshot;

    #[test]
    fn test_user_token_requires_token() {
        let config = AuthConfig::default();
        let result = build_source(
            AuthenticationMode::UserToken,
            &config,
            Arc::new(SystemClock),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_user_token_source() {
        let config = AuthConfig::from_snapshot(&EnvSnapshot::from_pairs([(
            "OSDU_MCP_USER_TOKEN",
            "a.b.c",
        )]))
        .unwrap();
        let source = build_source(
            AuthenticationMode::UserToken,
            &config,
            Arc::new(SystemClock),
        )
        .unwrap();
        assert_eq!(source.mode(), AuthenticationMode::UserToken);
        assert!(!source.supports_refresh());
    }

    #[cfg(not(feature = "aws"))]
    #[test]
    fn test_disabled_feature_reported() {
        let result = build_source(
            AuthenticationMode::Aws,
            &AuthConfig::default(),
            Arc::new(SystemClock),
        );
        assert!(matches!(
            result,
            Err(Error::FeatureDisabled { feature: "aws", .. })
        ));
    }

    #[cfg(not(feature = "azure"))]
    #[test]
    fn test_azure_config_checked_before_feature() {
        let result = build_source(
            AuthenticationMode::Azure,
            &AuthConfig::default(),
            Arc::new(SystemClock),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
