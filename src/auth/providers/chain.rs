//! Ordered credential chains.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::{AccessToken, AuthenticationMode, CredentialSource};
use crate::{Error, Result};

/// One link in a provider's credential chain.
#[async_trait]
pub trait CredentialMethod: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<AccessToken>;

    async fn close(&self) {}
}

/// Source that tries multiple methods in order and returns the first token.
pub struct ChainSource {
    mode: AuthenticationMode,
    name: String,
    methods: RwLock<Vec<Box<dyn CredentialMethod>>>,
}

impl ChainSource {
    pub fn new(mode: AuthenticationMode, name: impl Into<String>) -> Self {
        Self {
            mode,
            name: name.into(),
            methods: RwLock::new(Vec::new()),
        }
    }

    /// Add a method to the end of the chain.
    pub fn with<M: CredentialMethod + 'static>(mut self, method: M) -> Self {
        self.methods.get_mut().push(Box::new(method));
        self
    }

    pub fn with_boxed(mut self, method: Box<dyn CredentialMethod>) -> Self {
        self.methods.get_mut().push(method);
        self
    }

    pub async fn method_names(&self) -> Vec<String> {
        self.methods
            .read()
            .await
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }
}

impl std::fmt::Debug for ChainSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSource")
            .field("mode", &self.mode)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialSource for ChainSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> AuthenticationMode {
        self.mode
    }

    async fn fetch(&self) -> Result<AccessToken> {
        let methods = self.methods.read().await;
        if methods.is_empty() {
            return Err(Error::AuthProvider {
                mode: self.mode,
                attempted: Vec::new(),
                message: "no credential methods configured".into(),
            });
        }

        let mut attempted = Vec::with_capacity(methods.len());
        let mut errors = Vec::new();

        for method in methods.iter() {
            attempted.push(method.name().to_string());
            match method.fetch().await {
                Ok(token) => {
                    tracing::debug!(
                        mode = self.mode.as_str(),
                        method = method.name(),
                        "Credential resolved"
                    );
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!(
                        mode = self.mode.as_str(),
                        method = method.name(),
                        error = %e,
                        "Credential method failed"
                    );
                    errors.push(format!("{}: {}", method.name(), detail(&e)));
                }
            }
        }

        Err(Error::AuthProvider {
            mode: self.mode,
            attempted,
            message: errors.join("; "),
        })
    }

    async fn close(&self) {
        let mut methods = self.methods.write().await;
        for method in methods.iter() {
            method.close().await;
        }
        methods.clear();
    }
}

fn detail(error: &Error) -> String {
    match error {
        Error::Auth { message } => message.clone(),
        other => other.to_string(),
    }
}

/// Chain entry that always fails with a fixed reason.
///
/// Used where a method cannot be constructed in the current environment so
/// that it still shows up in the attempted list.
#[derive(Debug, Clone)]
pub struct UnavailableMethod {
    name: String,
    reason: String,
}

impl UnavailableMethod {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CredentialMethod for UnavailableMethod {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<AccessToken> {
        Err(Error::auth(self.reason.clone()))
    }
}
