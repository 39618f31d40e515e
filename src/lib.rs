//! # osdu-mcp-auth
//!
//! Credential resolution and bearer-token caching for the OSDU MCP server.
//!
//! A [`CredentialResolver`] detects which identity provider to use from the
//! process environment (manual token, Azure, AWS or GCP), acquires a bearer
//! token through that provider's credential chain, and caches it until it gets
//! close to expiry. Every OSDU API client shares one resolver and calls
//! [`CredentialResolver::get_access_token`] before each request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use osdu_mcp_auth::CredentialResolver;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), osdu_mcp_auth::Error> {
//!     let resolver = CredentialResolver::from_env().await?;
//!     let token = resolver.get_access_token().await?;
//!     println!("Got a bearer token ({} bytes)", token.len());
//!     resolver.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Cloud providers
//!
//! Provider SDKs are behind Cargo features (`aws`, `gcp`, `azure`,
//! `cloud-all`). Mode detection always works; building a provider whose
//! feature is disabled fails with [`Error::FeatureDisabled`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod config;
pub mod observability;

pub use auth::{
    AccessToken, AuthenticationMode, ChainSource, Clock, CredentialMethod, CredentialResolver,
    CredentialResolverBuilder, CredentialSource, DiscoveryProbe, ManualClock, ManualTokenSource,
    ModeDetector, SystemClock, TokenCache,
};
pub use config::{AuthConfig, ConfigError, ConfigManager, ConfigValue, EnvSnapshot};
pub use observability::{AuthMetrics, LoggingConfig, MetricsSnapshot, init_logging};

use chrono::{DateTime, Utc};

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while resolving credentials.
///
/// `Clone` so that one failed refresh can be delivered to every caller
/// waiting on it.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// No authentication mode could be detected from the environment.
    #[error("No authentication credentials configured. {guidance}")]
    NoCredentialsFound { guidance: String },

    /// `OSDU_MCP_AUTH_MODE` holds a value that is not a known mode.
    #[error(
        "Invalid authentication mode override '{value}'. Expected one of: user_token, azure, aws, gcp"
    )]
    InvalidModeOverride { value: String },

    /// Every method in the selected provider's chain failed.
    #[error("{mode} authentication failed after trying [{}]: {message}", attempted.join(", "))]
    AuthProvider {
        mode: auth::AuthenticationMode,
        attempted: Vec<String>,
        message: String,
    },

    /// The manual token's `exp` claim is in the past.
    #[error("Token has expired (exp {expired_at}). Replace OSDU_MCP_USER_TOKEN with a fresh token")]
    ExpiredToken { expired_at: DateTime<Utc> },

    /// The manual token is not a structurally valid JWT.
    #[error("Invalid JWT token format: {0}")]
    MalformedToken(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The detected mode needs a provider SDK that was not compiled in.
    #[error("{mode} authentication requires the '{feature}' feature of osdu-mcp-auth")]
    FeatureDisabled {
        mode: auth::AuthenticationMode,
        feature: &'static str,
    },

    /// The resolver was closed and can no longer hand out tokens.
    #[error("Credential resolver has been closed")]
    Closed,

    /// Authentication failed for a reason not covered above.
    #[error("Authentication failed: {message}")]
    Auth { message: String },
}

/// Error category for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Credentials were rejected or could not be produced
    Authorization,
    /// Environment or configuration must be changed by the operator
    Configuration,
    /// Provider connectivity problems that may succeed on the next call
    Transient,
    /// Internal state errors
    Internal,
}

impl Error {
    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::AuthProvider { message, .. } if is_connectivity_message(message) => {
                ErrorCategory::Transient
            }
            Error::AuthProvider { .. } | Error::ExpiredToken { .. } | Error::Auth { .. } => {
                ErrorCategory::Authorization
            }

            Error::NoCredentialsFound { .. }
            | Error::InvalidModeOverride { .. }
            | Error::MalformedToken(_)
            | Error::Config(_)
            | Error::FeatureDisabled { .. } => ErrorCategory::Configuration,

            Error::Closed => ErrorCategory::Internal,
        }
    }

    pub fn is_authorization_error(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    /// Status code used by the tool layer when wrapping this error.
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Authorization => 401,
            ErrorCategory::Configuration => 400,
            ErrorCategory::Transient => 503,
            ErrorCategory::Internal => 500,
        }
    }

    /// Message shown to the tool caller, prefixed by category.
    pub fn user_message(&self) -> String {
        match self.category() {
            ErrorCategory::Authorization => format!("Authentication error: {}", self),
            ErrorCategory::Configuration => match self {
                Error::Config(msg) => format!("Configuration error: {}", msg),
                other => format!("Configuration error: {}", other),
            },
            ErrorCategory::Transient => format!("Connection error: {}", self),
            ErrorCategory::Internal => format!("OSDU operation failed: {}", self),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

fn is_connectivity_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("connect") || lower.contains("timed out") || lower.contains("timeout")
}
