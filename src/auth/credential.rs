//! Token types.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

/// Lifetime assumed for refreshable tokens whose provider declares no expiry.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Near-expiry window for manual tokens.
pub const NEAR_EXPIRY_WINDOW_SECS: i64 = 300;

/// A bearer token as produced by a credential source.
#[derive(Clone)]
pub struct AccessToken {
    token: SecretString,
    expires_at: Option<DateTime<Utc>>,
    near_expiry: bool,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_at,
            near_expiry: false,
        }
    }

    /// Mark the token as valid but close to expiry.
    pub fn with_near_expiry_warning(mut self) -> Self {
        self.near_expiry = true;
        self
    }

    pub fn secret(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn expires_in(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at.map(|exp| exp - now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    pub fn near_expiry(&self) -> bool {
        self.near_expiry
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .field("near_expiry", &self.near_expiry)
            .finish()
    }
}

/// Token held by the cache together with the instant it stops being reusable.
pub(crate) struct CachedToken {
    token: AccessToken,
    fresh_until: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// `refreshable` sources get the safety margin subtracted; static tokens
    /// are reused until their declared expiry, or forever without one.
    pub(crate) fn new(
        token: AccessToken,
        fetched_at: DateTime<Utc>,
        margin: Duration,
        refreshable: bool,
    ) -> Self {
        let fresh_until = match (token.expires_at, refreshable) {
            (Some(exp), true) => Some(minus_margin(exp, margin)),
            (Some(exp), false) => Some(exp),
            (None, true) => {
                let assumed = fetched_at
                    .checked_add_signed(Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
                    .unwrap_or(fetched_at);
                Some(minus_margin(assumed, margin))
            }
            (None, false) => None,
        };
        Self { token, fresh_until }
    }

    pub(crate) fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.fresh_until.is_none_or(|until| now < until)
    }

    pub(crate) fn token(&self) -> &AccessToken {
        &self.token
    }
}

/// Out-of-range results count as already stale.
fn minus_margin(at: DateTime<Utc>, margin: Duration) -> DateTime<Utc> {
    at.checked_sub_signed(margin).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("expires_at", &self.token.expires_at)
            .field("fresh_until", &self.fresh_until)
            .finish()
    }
}
