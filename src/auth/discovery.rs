//! Ambient credential discovery probes.
//!
//! Probes answer "could this provider authenticate without explicit
//! configuration?" and never fail: every error is reported as `false`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::EnvSnapshot;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait]
pub trait DiscoveryProbe: Send + Sync {
    /// IAM role, SSO session or shared profile reachable.
    async fn aws_available(&self) -> bool;

    /// gcloud application-default login or metadata service reachable.
    async fn gcp_available(&self) -> bool;
}

/// Probe that never finds ambient credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiscovery;

#[async_trait]
impl DiscoveryProbe for NoDiscovery {
    async fn aws_available(&self) -> bool {
        false
    }

    async fn gcp_available(&self) -> bool {
        false
    }
}

/// Probe with fixed answers that records how often it was asked.
#[derive(Debug, Default)]
pub struct StaticProbe {
    aws: bool,
    gcp: bool,
    probes: AtomicUsize,
}

impl StaticProbe {
    pub fn new(aws: bool, gcp: bool) -> Self {
        Self {
            aws,
            gcp,
            probes: AtomicUsize::new(0),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscoveryProbe for StaticProbe {
    async fn aws_available(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.aws
    }

    async fn gcp_available(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.gcp
    }
}

/// Probe that inspects well-known credential files and environment markers,
/// then (with the matching feature) asks the instance metadata services.
#[derive(Debug, Clone)]
pub struct AmbientProbe {
    env: EnvSnapshot,
    home: Option<PathBuf>,
    timeout: Duration,
}

impl AmbientProbe {
    pub fn new(env: EnvSnapshot) -> Self {
        let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        Self {
            env,
            home,
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn aws_markers_present(&self) -> bool {
        const MARKERS: [&str; 3] = [
            "AWS_WEB_IDENTITY_TOKEN_FILE",
            "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI",
            "AWS_CONTAINER_CREDENTIALS_FULL_URI",
        ];
        if MARKERS.iter().any(|var| self.env.is_set(var)) {
            return true;
        }

        let explicit_files = ["AWS_SHARED_CREDENTIALS_FILE", "AWS_CONFIG_FILE"]
            .iter()
            .filter_map(|var| self.env.non_empty(var))
            .map(PathBuf::from);
        let default_files = self
            .home
            .iter()
            .flat_map(|home| [home.join(".aws/credentials"), home.join(".aws/config")]);

        explicit_files.chain(default_files).any(|path| path.is_file())
    }

    fn gcp_adc_file(&self) -> Option<PathBuf> {
        const ADC_FILE: &str = "application_default_credentials.json";

        if let Some(dir) = self.env.non_empty("CLOUDSDK_CONFIG") {
            return Some(PathBuf::from(dir).join(ADC_FILE));
        }
        if cfg!(windows) {
            return self
                .env
                .non_empty("APPDATA")
                .map(|appdata| PathBuf::from(appdata).join("gcloud").join(ADC_FILE));
        }
        self.home
            .as_ref()
            .map(|home| home.join(".config/gcloud").join(ADC_FILE))
    }

    #[cfg(feature = "aws")]
    async fn aws_instance_role(&self) -> bool {
        use aws_credential_types::provider::ProvideCredentials;

        let provider = aws_config::imds::credentials::ImdsCredentialsProvider::builder().build();
        matches!(
            tokio::time::timeout(self.timeout, provider.provide_credentials()).await,
            Ok(Ok(_))
        )
    }

    #[cfg(not(feature = "aws"))]
    async fn aws_instance_role(&self) -> bool {
        false
    }

    #[cfg(feature = "gcp")]
    async fn gcp_metadata(&self) -> bool {
        matches!(
            tokio::time::timeout(self.timeout, gcp_auth::MetadataServiceAccount::new()).await,
            Ok(Ok(_))
        )
    }

    #[cfg(not(feature = "gcp"))]
    async fn gcp_metadata(&self) -> bool {
        false
    }
}

#[async_trait]
impl DiscoveryProbe for AmbientProbe {
    async fn aws_available(&self) -> bool {
        if self.aws_markers_present() {
            tracing::debug!("AWS credentials discovered from environment or shared files");
            return true;
        }
        self.aws_instance_role().await
    }

    async fn gcp_available(&self) -> bool {
        if self.gcp_adc_file().is_some_and(|path| path.is_file()) {
            tracing::debug!("GCP application default credentials file found");
            return true;
        }
        self.gcp_metadata().await
    }
}
