//! Google Cloud credential chain.

use std::path::Path;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Methods in the order they are tried. `service_account_key` is only present
/// when `GOOGLE_APPLICATION_CREDENTIALS` is set.
pub fn chain_order(credentials_path: Option<&Path>) -> Vec<&'static str> {
    let mut order = Vec::with_capacity(4);
    if credentials_path.is_some() {
        order.push("service_account_key");
    }
    order.extend(["application_default", "gcloud_cli", "metadata_service"]);
    order
}

pub fn classify_error(raw: &str) -> String {
    let message = raw.to_lowercase();

    if message.contains("file not found") || message.contains("no such file") {
        "GCP credentials file not found. Check GOOGLE_APPLICATION_CREDENTIALS path".into()
    } else if message.contains("invalid") || message.contains("malformed") {
        "GCP credentials invalid. Run 'gcloud auth application-default login' to re-authenticate"
            .into()
    } else if message.contains("expired") {
        "GCP refresh token expired. Run 'gcloud auth application-default login' to re-authenticate"
            .into()
    } else {
        format!("GCP token refresh failed: {}", raw)
    }
}

#[cfg(feature = "gcp")]
pub use sdk::build;

#[cfg(feature = "gcp")]
mod sdk {
    use std::path::PathBuf;
    use std::sync::Arc;

    use async_trait::async_trait;
    use gcp_auth::{
        ConfigDefaultCredentials, CustomServiceAccount, GCloudAuthorizedUser,
        MetadataServiceAccount, TokenProvider,
    };
    use tokio::sync::OnceCell;

    use super::{CLOUD_PLATFORM_SCOPE, chain_order, classify_error};
    use crate::auth::providers::chain::{ChainSource, CredentialMethod};
    use crate::auth::{AccessToken, AuthenticationMode};
    use crate::config::AuthConfig;
    use crate::{Error, Result};

    enum Kind {
        ServiceAccountKey(PathBuf),
        ApplicationDefault,
        GCloudCli,
        MetadataService,
    }

    /// Connects on first use and keeps the provider for later fetches.
    struct GcpMethod {
        name: &'static str,
        kind: Kind,
        provider: OnceCell<Arc<dyn TokenProvider>>,
    }

    impl GcpMethod {
        fn new(name: &'static str, kind: Kind) -> Self {
            Self {
                name,
                kind,
                provider: OnceCell::new(),
            }
        }

        async fn connect(&self) -> std::result::Result<Arc<dyn TokenProvider>, gcp_auth::Error> {
            let provider: Arc<dyn TokenProvider> = match &self.kind {
                Kind::ServiceAccountKey(path) => Arc::new(CustomServiceAccount::from_file(path)?),
                Kind::ApplicationDefault => Arc::new(ConfigDefaultCredentials::new().await?),
                Kind::GCloudCli => Arc::new(GCloudAuthorizedUser::new().await?),
                Kind::MetadataService => Arc::new(MetadataServiceAccount::new().await?),
            };
            Ok(provider)
        }
    }

    #[async_trait]
    impl CredentialMethod for GcpMethod {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> Result<AccessToken> {
            let provider = self
                .provider
                .get_or_try_init(|| self.connect())
                .await
                .map_err(|e| Error::auth(classify_error(&e.to_string())))?;

            let token = provider
                .token(&[CLOUD_PLATFORM_SCOPE])
                .await
                .map_err(|e| Error::auth(classify_error(&e.to_string())))?;

            tracing::info!(method = self.name, "GCP token obtained");
            Ok(AccessToken::new(token.as_str(), Some(token.expires_at())))
        }
    }

    pub fn build(config: &AuthConfig) -> Result<ChainSource> {
        let path = config.gcp.credentials_path.as_deref();
        let mut chain = ChainSource::new(AuthenticationMode::Gcp, "gcp");

        for name in chain_order(path) {
            let kind = match (name, path) {
                ("service_account_key", Some(path)) => Kind::ServiceAccountKey(path.to_path_buf()),
                ("application_default", _) => Kind::ApplicationDefault,
                ("gcloud_cli", _) => Kind::GCloudCli,
                _ => Kind::MetadataService,
            };
            chain = chain.with(GcpMethod::new(name, kind));
        }

        tracing::debug!(methods = ?chain_order(path), "GCP credential chain configured");
        Ok(chain)
    }
}
