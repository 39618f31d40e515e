//! Environment-first configuration with YAML fallback.
//!
//! ```rust,no_run
//! use osdu_mcp_auth::config::{AuthConfig, ConfigManager};
//!
//! # fn example() -> Result<(), osdu_mcp_auth::ConfigError> {
//! let manager = ConfigManager::load()?;
//! let auth = AuthConfig::from_config(&manager)?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod env;
pub mod file;
pub mod manager;

pub use auth::{
    AuthConfig, AwsSettings, AzureSettings, DEFAULT_REFRESH_MARGIN, GcpSettings,
    MAX_REFRESH_MARGIN, check_refresh_margin, vars,
};
pub use env::EnvSnapshot;
pub use file::FileConfig;
pub use manager::{ConfigManager, ConfigValue, DEFAULT_CONFIG_FILE, ENV_PREFIX};

use thiserror::Error;

/// Errors that can occur in configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required key not found in environment or file
    #[error("Required configuration '{key}' not found. Set environment variable {env_var} or add to config.yaml")]
    NotFound {
        /// Dotted `section.key` name
        key: String,
        /// Environment variable that would satisfy it
        env_var: String,
    },

    /// Invalid configuration value
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The key with invalid value
        key: String,
        /// Error message
        message: String,
    },

    /// IO error (file operations)
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error
    #[error("Failed to load config file: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
