//! Pre-supplied bearer token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};

use crate::auth::credential::NEAR_EXPIRY_WINDOW_SECS;
use crate::auth::jwt;
use crate::auth::{AccessToken, AuthenticationMode, Clock, CredentialSource, SystemClock};
use crate::config::vars;
use crate::{Error, Result};

enum TokenInput {
    Static(SecretString),
    /// Re-read on every fetch so a replaced token is picked up.
    Env(String),
}

/// Source for tokens supplied through `OSDU_MCP_USER_TOKEN`.
///
/// The token is not signature-verified; only its structure and `exp` claim
/// are checked before it is handed out.
pub struct ManualTokenSource {
    input: TokenInput,
    clock: Arc<dyn Clock>,
}

impl ManualTokenSource {
    pub fn new(token: SecretString) -> Self {
        Self {
            input: TokenInput::Static(token),
            clock: Arc::new(SystemClock),
        }
    }

    /// Read the token from `OSDU_MCP_USER_TOKEN` at each fetch.
    pub fn from_env() -> Self {
        Self::from_env_var(vars::USER_TOKEN)
    }

    pub fn from_env_var(var: impl Into<String>) -> Self {
        Self {
            input: TokenInput::Env(var.into()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn current_token(&self) -> Result<SecretString> {
        match &self.input {
            TokenInput::Static(token) => Ok(token.clone()),
            TokenInput::Env(var) => std::env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
                .ok_or_else(|| Error::auth(format!("{} is not set", var))),
        }
    }
}

impl std::fmt::Debug for ManualTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let input = match &self.input {
            TokenInput::Static(_) => "static",
            TokenInput::Env(var) => var.as_str(),
        };
        f.debug_struct("ManualTokenSource")
            .field("input", &input)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialSource for ManualTokenSource {
    fn name(&self) -> &str {
        "user_token"
    }

    fn mode(&self) -> AuthenticationMode {
        AuthenticationMode::UserToken
    }

    async fn fetch(&self) -> Result<AccessToken> {
        let token = self.current_token()?;
        let raw = token.expose_secret().trim();
        let claims = jwt::decode_unverified(raw)?;

        let Some(expires_at) = claims.expires_at else {
            return Ok(AccessToken::new(raw, None));
        };

        let now = self.clock.now();
        if now > expires_at {
            return Err(Error::ExpiredToken {
                expired_at: expires_at,
            });
        }

        let access = AccessToken::new(raw, Some(expires_at));
        if expires_at - now < Duration::seconds(NEAR_EXPIRY_WINDOW_SECS) {
            Ok(access.with_near_expiry_warning())
        } else {
            Ok(access)
        }
    }

    fn supports_refresh(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde_json::json;

    use super::*;
    use crate::auth::ManualClock;
    use crate::auth::jwt::encode_unsigned;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn source(payload: serde_json::Value) -> ManualTokenSource {
        ManualTokenSource::new(SecretString::from(encode_unsigned(&payload)))
            .with_clock(Arc::new(ManualClock::new(start())))
    }

    #[tokio::test]
    async fn test_valid_token() {
        let exp = start().timestamp() + 3600;
        let token = source(json!({"exp": exp})).fetch().await.unwrap();
        assert_eq!(token.expires_at().unwrap().timestamp(), exp);
        assert!(!token.near_expiry());
    }

    #[tokio::test]
    async fn test_near_expiry_flagged() {
        let token = source(json!({"exp": start().timestamp() + 120}))
            .fetch()
            .await
            .unwrap();
        assert!(token.near_expiry());
    }

    #[tokio::test]
    async fn test_expired_token() {
        let err = source(json!({"exp": start().timestamp() - 120}))
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExpiredToken { expired_at } if expired_at < start()));
    }

    #[tokio::test]
    async fn test_token_without_exp() {
        let token = source(json!({"sub": "svc"})).fetch().await.unwrap();
        assert!(token.expires_at().is_none());
    }

    #[tokio::test]
    async fn test_malformed_token() {
        let src = ManualTokenSource::new(SecretString::from("not-a-jwt".to_string()));
        assert!(matches!(src.fetch().await, Err(Error::MalformedToken(_))));
        assert!(!src.supports_refresh());
    }

    #[tokio::test]
    async fn test_missing_env_var() {
        let src = ManualTokenSource::from_env_var("OSDU_MCP_TEST_TOKEN_THAT_IS_NEVER_SET");
        let err = src.fetch().await.unwrap_err();
        assert!(err.to_string().contains("OSDU_MCP_TEST_TOKEN_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_debug_hides_token() {
        let src = ManualTokenSource::new(SecretString::from("secret.value.here".to_string()));
        assert!(!format!("{:?}", src).contains("secret.value.here"));
    }
}
