//! Azure Entra ID credential chain.
//!
//! With `AZURE_CLIENT_SECRET` set the chain is service principal then managed
//! identity. Without it the chain is managed identity then the Azure CLI,
//! followed by interactive browser login when explicitly allowed.

use crate::config::AuthConfig;
use crate::{Error, Result};

/// Resolve the OAuth scope: `OSDU_MCP_AUTH_SCOPE` or `{AZURE_CLIENT_ID}/.default`.
pub fn resolve_scope(config: &AuthConfig) -> Result<String> {
    if let Some(scope) = &config.scope_override {
        return Ok(scope.clone());
    }
    config
        .azure
        .client_id
        .as_ref()
        .map(|client_id| format!("{}/.default", client_id))
        .ok_or_else(|| {
            Error::config(
                "AZURE_CLIENT_ID environment variable is required for Azure authentication",
            )
        })
}

/// Methods in the order they are tried.
pub fn chain_order(config: &AuthConfig) -> Vec<&'static str> {
    if config.azure.client_secret.is_some() {
        vec!["client_secret", "managed_identity"]
    } else if config.azure.allow_interactive {
        vec!["managed_identity", "azure_cli", "interactive_browser"]
    } else {
        vec!["managed_identity", "azure_cli"]
    }
}

/// Turn raw SDK error text into operator guidance without echoing secrets.
pub fn classify_error(raw: &str, has_client_secret: bool) -> String {
    let message = raw.to_lowercase();

    if message.contains("az login") || message.contains("azurecli") {
        "Please run 'az login' before using OSDU MCP Server".into()
    } else if message.contains("expired") || message.contains("refresh token") {
        "Azure authentication token expired. Please run 'az login' to refresh".into()
    } else if message.contains("invalid_scope") || message.contains("scope format is invalid") {
        "Invalid Azure client ID. Please verify your AZURE_CLIENT_ID is correct".into()
    } else if message.contains("no accounts were found")
        || message.contains("environment variables are not fully configured")
    {
        if has_client_secret {
            "Service Principal authentication failed. Please check your AZURE_CLIENT_ID, \
             AZURE_TENANT_ID, and AZURE_CLIENT_SECRET environment variables"
                .into()
        } else {
            "No Azure credentials found. Please set up Service Principal credentials \
             or run 'az login' for CLI authentication"
                .into()
        }
    } else if message.contains("connection") || message.contains("timeout") {
        "Failed to connect to Azure authentication service. Please check your network connection"
            .into()
    } else {
        "Authentication failed. Please check your Azure credentials".into()
    }
}

#[cfg(feature = "azure")]
pub use sdk::build;

#[cfg(feature = "azure")]
mod sdk {
    use std::sync::Arc;

    use async_trait::async_trait;
    use azure_core::credentials::{Secret, TokenCredential};
    use azure_identity::{AzureCliCredential, ClientSecretCredential, ManagedIdentityCredential};
    use chrono::DateTime;
    use secrecy::ExposeSecret;

    use super::{chain_order, classify_error, resolve_scope};
    use crate::auth::providers::chain::{ChainSource, CredentialMethod, UnavailableMethod};
    use crate::auth::{AccessToken, AuthenticationMode};
    use crate::config::AuthConfig;
    use crate::{Error, Result};

    struct AzureMethod {
        name: &'static str,
        credential: Arc<dyn TokenCredential>,
        scope: String,
        has_client_secret: bool,
    }

    #[async_trait]
    impl CredentialMethod for AzureMethod {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> Result<AccessToken> {
            let token = self
                .credential
                .get_token(&[self.scope.as_str()], None)
                .await
                .map_err(|e| Error::auth(classify_error(&e.to_string(), self.has_client_secret)))?;

            let expires_at = DateTime::from_timestamp(token.expires_on.unix_timestamp(), 0);
            tracing::info!(method = self.name, "Azure token obtained");
            Ok(AccessToken::new(token.token.secret(), expires_at))
        }
    }

    fn method(
        name: &'static str,
        credential: std::result::Result<Arc<dyn TokenCredential>, String>,
        scope: &str,
        has_client_secret: bool,
    ) -> Box<dyn CredentialMethod> {
        match credential {
            Ok(credential) => Box::new(AzureMethod {
                name,
                credential,
                scope: scope.to_string(),
                has_client_secret,
            }),
            Err(e) => Box::new(UnavailableMethod::new(
                name,
                classify_error(&e, has_client_secret),
            )),
        }
    }

    fn client_secret(
        config: &AuthConfig,
    ) -> std::result::Result<Arc<dyn TokenCredential>, String> {
        let (Some(tenant_id), Some(client_id), Some(secret)) = (
            config.azure.tenant_id.as_deref(),
            config.azure.client_id.as_deref(),
            config.azure.client_secret.as_ref(),
        ) else {
            return Err("environment variables are not fully configured".into());
        };
        ClientSecretCredential::new(
            tenant_id,
            client_id.to_string(),
            Secret::new(secret.expose_secret().to_string()),
            None,
        )
        .map(|c| c as Arc<dyn TokenCredential>)
        .map_err(|e| e.to_string())
    }

    pub fn build(config: &AuthConfig) -> Result<ChainSource> {
        let scope = resolve_scope(config)?;
        let has_secret = config.azure.client_secret.is_some();
        let mut chain = ChainSource::new(AuthenticationMode::Azure, "azure");

        for name in chain_order(config) {
            let entry = match name {
                "client_secret" => method(name, client_secret(config), &scope, has_secret),
                "managed_identity" => method(
                    name,
                    ManagedIdentityCredential::new(None)
                        .map(|c| c as Arc<dyn TokenCredential>)
                        .map_err(|e| e.to_string()),
                    &scope,
                    has_secret,
                ),
                "azure_cli" => method(
                    name,
                    AzureCliCredential::new(None)
                        .map(|c| c as Arc<dyn TokenCredential>)
                        .map_err(|e| e.to_string()),
                    &scope,
                    has_secret,
                ),
                _ => Box::new(UnavailableMethod::new(
                    name,
                    "Interactive browser login is not supported by this build; run 'az login'",
                )),
            };
            chain = chain.with_boxed(entry);
        }

        tracing::debug!(methods = ?chain_order(config), "Azure credential chain configured");
        Ok(chain)
    }
}
