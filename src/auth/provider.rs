//! Credential source trait.

use async_trait::async_trait;

use super::credential::AccessToken;
use super::mode::AuthenticationMode;
use crate::Result;

/// A provider-specific way of obtaining bearer tokens.
///
/// Sources are driven by [`TokenCache`](super::TokenCache), which guarantees
/// at most one `fetch` in flight at a time.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Source name for debugging.
    fn name(&self) -> &str;

    fn mode(&self) -> AuthenticationMode;

    /// Acquire a fresh token.
    async fn fetch(&self) -> Result<AccessToken>;

    /// Whether a later `fetch` can return a different token.
    ///
    /// Non-refreshable tokens are cached until their own expiry without the
    /// refresh margin.
    fn supports_refresh(&self) -> bool {
        true
    }

    /// Release SDK clients and connections. Called at most once.
    async fn close(&self) {}
}
