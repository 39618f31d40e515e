//! Authentication for the OSDU platform.
//!
//! - **Mode detection**: manual token, Azure, AWS or GCP, picked from the
//!   environment in a fixed priority order
//! - **Credential sources**: one ordered chain of methods per provider
//! - **Token cache**: safety-margin expiry and single-flight refresh

mod cache;
mod clock;
mod credential;
pub mod discovery;
pub mod jwt;
mod mode;
mod provider;
pub mod providers;
mod resolver;

pub use cache::TokenCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{AccessToken, DEFAULT_TOKEN_TTL_SECS, NEAR_EXPIRY_WINDOW_SECS};
pub use discovery::{AmbientProbe, DiscoveryProbe, NoDiscovery, StaticProbe};
pub use mode::{AuthenticationMode, ModeDetector};
pub use provider::CredentialSource;
pub use providers::{
    ChainSource, CredentialMethod, ManualTokenSource, UnavailableMethod, build_source,
};
pub use resolver::{CredentialResolver, CredentialResolverBuilder};
