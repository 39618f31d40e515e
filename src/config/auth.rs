//! Authentication settings read from the environment snapshot.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::env::EnvSnapshot;
use super::manager::ConfigManager;
use super::{ConfigError, ConfigResult};

/// Environment variable names understood by the resolver.
pub mod vars {
    pub const USER_TOKEN: &str = "OSDU_MCP_USER_TOKEN";
    pub const AUTH_SCOPE: &str = "OSDU_MCP_AUTH_SCOPE";
    pub const AUTH_MODE: &str = "OSDU_MCP_AUTH_MODE";

    pub const AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
    pub const AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
    pub const AZURE_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";

    pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
    pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
    pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
    pub const AWS_PROFILE: &str = "AWS_PROFILE";
    pub const AWS_REGION: &str = "AWS_REGION";
    pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";

    pub const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
}

pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Exclusive upper bound for the refresh margin. A margin this long would
/// refresh a one-hour token on every call.
pub const MAX_REFRESH_MARGIN: Duration = Duration::from_secs(3600);

/// Reject margins at or above [`MAX_REFRESH_MARGIN`].
pub fn check_refresh_margin(margin: Duration) -> ConfigResult<Duration> {
    if margin >= MAX_REFRESH_MARGIN {
        return Err(ConfigError::InvalidValue {
            key: "auth.refresh_margin".into(),
            message: format!(
                "must be less than {} seconds, got {}",
                MAX_REFRESH_MARGIN.as_secs(),
                margin.as_secs()
            ),
        });
    }
    Ok(margin)
}

#[derive(Clone, Default)]
pub struct AzureSettings {
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub allow_interactive: bool,
}

#[derive(Clone, Default)]
pub struct AwsSettings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecretString>,
    pub session_token: Option<SecretString>,
    pub profile: Option<String>,
    pub region: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GcpSettings {
    pub credentials_path: Option<PathBuf>,
}

/// Typed authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub user_token: Option<SecretString>,
    pub scope_override: Option<String>,
    /// Raw override value; validated during mode detection.
    pub mode_override: Option<String>,
    pub refresh_margin: Duration,
    pub azure: AzureSettings,
    pub aws: AwsSettings,
    pub gcp: GcpSettings,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_token: None,
            scope_override: None,
            mode_override: None,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            azure: AzureSettings::default(),
            aws: AwsSettings::default(),
            gcp: GcpSettings::default(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_config(&ConfigManager::load()?)
    }

    /// Build from a snapshot with no file layer.
    pub fn from_snapshot(env: &EnvSnapshot) -> ConfigResult<Self> {
        Self::from_config(&ConfigManager::from_env(env.clone()))
    }

    pub fn from_config(config: &ConfigManager) -> ConfigResult<Self> {
        let env = config.env();
        let secret = |key: &str| env.non_empty(key).map(|v| SecretString::from(v.to_string()));
        let text = |key: &str| env.non_empty(key).map(str::to_string);

        let refresh_margin = match config.get_i64("auth", "refresh_margin")? {
            Some(secs) if secs < 0 => {
                return Err(ConfigError::InvalidValue {
                    key: "auth.refresh_margin".into(),
                    message: "must not be negative".into(),
                });
            }
            Some(secs) => check_refresh_margin(Duration::from_secs(secs as u64))?,
            None => DEFAULT_REFRESH_MARGIN,
        };

        Ok(Self {
            user_token: secret(vars::USER_TOKEN),
            scope_override: config.get_raw("auth", "scope"),
            mode_override: config.get_raw("auth", "mode"),
            refresh_margin,
            azure: AzureSettings {
                client_id: text(vars::AZURE_CLIENT_ID),
                tenant_id: text(vars::AZURE_TENANT_ID),
                client_secret: secret(vars::AZURE_CLIENT_SECRET),
                allow_interactive: config.get_bool("auth", "allow_interactive", false)?,
            },
            aws: AwsSettings {
                access_key_id: text(vars::AWS_ACCESS_KEY_ID),
                secret_access_key: secret(vars::AWS_SECRET_ACCESS_KEY),
                session_token: secret(vars::AWS_SESSION_TOKEN),
                profile: text(vars::AWS_PROFILE),
                region: env
                    .first_of(&[vars::AWS_REGION, vars::AWS_DEFAULT_REGION])
                    .map(str::to_string),
            },
            gcp: GcpSettings {
                credentials_path: env
                    .non_empty(vars::GOOGLE_APPLICATION_CREDENTIALS)
                    .map(PathBuf::from),
            },
        })
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }
}

fn redact<T>(value: &Option<T>) -> Option<&'static str> {
    value.as_ref().map(|_| "[redacted]")
}

impl fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureSettings")
            .field("client_id", &self.client_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("allow_interactive", &self.allow_interactive)
            .finish()
    }
}

impl fmt::Debug for AwsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSettings")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("session_token", &redact(&self.session_token))
            .field("profile", &self.profile)
            .field("region", &self.region)
            .finish()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("user_token", &redact(&self.user_token))
            .field("scope_override", &self.scope_override)
            .field("mode_override", &self.mode_override)
            .field("refresh_margin", &self.refresh_margin)
            .field("azure", &self.azure)
            .field("aws", &self.aws)
            .field("gcp", &self.gcp)
            .finish()
    }
}
