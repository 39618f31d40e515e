//! Logging setup and authentication metrics.
//!
//! Logs are JSON lines on stderr so they never mix with MCP traffic on
//! stdout. `OSDU_MCP_LOGGING_ENABLED` turns them on and
//! `OSDU_MCP_LOGGING_LEVEL` picks the level; `RUST_LOG` still wins when set.

mod metrics;

pub use metrics::{AuthMetrics, Counter, MetricsSnapshot};

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigManager, ConfigResult};

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: DEFAULT_LOG_LEVEL.into(),
        }
    }
}

impl LoggingConfig {
    pub fn from_config(config: &ConfigManager) -> ConfigResult<Self> {
        Ok(Self {
            enabled: config.get_bool("logging", "enabled", false)?,
            level: config
                .get_string("logging", "level")
                .map(|level| level.to_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.into()),
        })
    }

    /// Filter directive: the configured level, or errors only when disabled.
    pub fn directive(&self) -> &str {
        if self.enabled { &self.level } else { "error" }
    }
}

/// Install a global JSON subscriber writing to stderr.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directive()));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}
