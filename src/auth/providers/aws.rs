//! AWS credential chain.
//!
//! OSDU on AWS accepts the STS session token as a bearer token. Credentials
//! that already carry a session token are used directly; long-lived keys are
//! exchanged through `GetSessionToken`.

use crate::config::AuthConfig;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Lifetime requested from `GetSessionToken`.
pub const SESSION_DURATION_SECS: i32 = 3600;

pub fn region(config: &AuthConfig) -> String {
    config
        .aws
        .region
        .clone()
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

/// Methods in the order they are tried. `static_keys` is only present when
/// `AWS_ACCESS_KEY_ID` is set.
pub fn chain_order(config: &AuthConfig) -> Vec<&'static str> {
    let mut order = Vec::with_capacity(5);
    if config.aws.access_key_id.is_some() {
        order.push("static_keys");
    }
    order.extend(["profile", "web_identity", "container_role", "instance_role"]);
    order
}

#[cfg(feature = "aws")]
pub use sdk::build;

#[cfg(feature = "aws")]
mod sdk {
    use async_trait::async_trait;
    use aws_config::{BehaviorVersion, Region};
    use aws_credential_types::Credentials;
    use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
    use chrono::{DateTime, Utc};
    use secrecy::ExposeSecret;

    use super::{SESSION_DURATION_SECS, chain_order, region};
    use crate::auth::providers::chain::{ChainSource, CredentialMethod, UnavailableMethod};
    use crate::auth::{AccessToken, AuthenticationMode};
    use crate::config::AuthConfig;
    use crate::{Error, Result};

    struct AwsMethod {
        name: &'static str,
        provider: SharedCredentialsProvider,
        region: String,
    }

    impl AwsMethod {
        fn new(name: &'static str, provider: impl ProvideCredentials + 'static, region: &str) -> Self {
            Self {
                name,
                provider: SharedCredentialsProvider::new(provider),
                region: region.to_string(),
            }
        }

        async fn session_token(&self) -> Result<AccessToken> {
            let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(self.region.clone()))
                .credentials_provider(self.provider.clone())
                .load()
                .await;

            let output = aws_sdk_sts::Client::new(&sdk_config)
                .get_session_token()
                .duration_seconds(SESSION_DURATION_SECS)
                .send()
                .await
                .map_err(|e| {
                    Error::auth(format!(
                        "AWS token retrieval failed: {}",
                        aws_sdk_sts::error::DisplayErrorContext(&e)
                    ))
                })?;

            let credentials = output
                .credentials()
                .ok_or_else(|| Error::auth("AWS token retrieval failed: STS returned no credentials"))?;

            let expires_at = DateTime::from_timestamp(credentials.expiration().secs(), 0);
            Ok(AccessToken::new(credentials.session_token(), expires_at))
        }
    }

    #[async_trait]
    impl CredentialMethod for AwsMethod {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> Result<AccessToken> {
            let credentials = self
                .provider
                .provide_credentials()
                .await
                .map_err(|e| Error::auth(format!("AWS credentials unavailable: {}", e)))?;

            let token = match credentials.session_token() {
                Some(session_token) => {
                    let expires_at = credentials.expiry().map(DateTime::<Utc>::from);
                    AccessToken::new(session_token, expires_at)
                }
                None => self.session_token().await?,
            };

            tracing::info!(method = self.name, "AWS session token obtained");
            Ok(token)
        }
    }

    fn static_keys(config: &AuthConfig, region: &str) -> Box<dyn CredentialMethod> {
        let (Some(access_key_id), Some(secret)) = (
            config.aws.access_key_id.as_ref(),
            config.aws.secret_access_key.as_ref(),
        ) else {
            return Box::new(UnavailableMethod::new(
                "static_keys",
                "AWS_SECRET_ACCESS_KEY is required with AWS_ACCESS_KEY_ID",
            ));
        };

        let credentials = Credentials::new(
            access_key_id.clone(),
            secret.expose_secret().to_string(),
            config
                .aws
                .session_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            None,
            "osdu-mcp-environment",
        );
        Box::new(AwsMethod::new("static_keys", credentials, region))
    }

    fn profile(config: &AuthConfig, region: &str) -> Box<dyn CredentialMethod> {
        let mut builder = aws_config::profile::ProfileFileCredentialsProvider::builder();
        if let Some(name) = &config.aws.profile {
            builder = builder.profile_name(name);
        }
        Box::new(AwsMethod::new("profile", builder.build(), region))
    }

    pub fn build(config: &AuthConfig) -> Result<ChainSource> {
        let region = region(config);
        let mut chain = ChainSource::new(AuthenticationMode::Aws, "aws");

        for name in chain_order(config) {
            let entry: Box<dyn CredentialMethod> = match name {
                "static_keys" => static_keys(config, &region),
                "profile" => profile(config, &region),
                "web_identity" => Box::new(AwsMethod::new(
                    name,
                    aws_config::web_identity_token::WebIdentityTokenCredentialsProvider::builder()
                        .build(),
                    &region,
                )),
                "container_role" => Box::new(AwsMethod::new(
                    name,
                    aws_config::ecs::EcsCredentialsProvider::builder().build(),
                    &region,
                )),
                _ => Box::new(AwsMethod::new(
                    name,
                    aws_config::imds::credentials::ImdsCredentialsProvider::builder().build(),
                    &region,
                )),
            };
            chain = chain.with_boxed(entry);
        }

        tracing::debug!(region = %region, methods = ?chain_order(config), "AWS credential chain configured");
        Ok(chain)
    }
}
