//! Layered configuration lookup.
//!
//! Priority order for `get(section, key)`:
//! 1. Environment variable `OSDU_MCP_{SECTION}_{KEY}`
//! 2. YAML configuration file
//! 3. Caller default

use std::fmt;
use std::path::Path;

use super::env::EnvSnapshot;
use super::file::FileConfig;
use super::{ConfigError, ConfigResult};

pub const ENV_PREFIX: &str = "OSDU_MCP_";
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConfigValue {
    /// Interpret an environment string: booleans first, then numbers, then text.
    pub fn parse_env(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        match lower.as_str() {
            "true" | "yes" | "1" => return ConfigValue::Bool(true),
            "false" | "no" | "0" => return ConfigValue::Bool(false),
            _ => {}
        }

        if raw.contains('.') {
            if let Ok(f) = raw.parse::<f64>() {
                return ConfigValue::Float(f);
            }
        } else if let Ok(i) = raw.parse::<i64>() {
            return ConfigValue::Int(i);
        }

        ConfigValue::Str(raw.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Int(i) => Some(*i != 0),
            ConfigValue::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Some(true),
                "false" | "no" | "off" => Some(false),
                _ => None,
            },
            ConfigValue::Float(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            // "1" and "0" parse as booleans
            ConfigValue::Bool(b) => Some(i64::from(*b)),
            ConfigValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            ConfigValue::Float(_) => None,
            ConfigValue::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(v) => write!(f, "{}", v),
            ConfigValue::Str(s) => f.write_str(s),
        }
    }
}

/// Environment-first configuration with YAML fallback.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    env: EnvSnapshot,
    file: Option<FileConfig>,
}

impl ConfigManager {
    /// Snapshot the process environment and read `config.yaml` if present.
    pub fn load() -> ConfigResult<Self> {
        Self::with_file(EnvSnapshot::from_process(), DEFAULT_CONFIG_FILE)
    }

    pub fn with_file(env: EnvSnapshot, path: impl AsRef<Path>) -> ConfigResult<Self> {
        let file = FileConfig::load(path)?;
        if let Some(ref file) = file {
            tracing::debug!(path = %file.path().display(), "Loaded configuration file");
        }
        Ok(Self { env, file })
    }

    /// Environment only, no file layer.
    pub fn from_env(env: EnvSnapshot) -> Self {
        Self { env, file: None }
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    pub fn env_var_name(section: &str, key: &str) -> String {
        format!(
            "{}{}_{}",
            ENV_PREFIX,
            section.to_uppercase(),
            key.to_uppercase()
        )
    }

    pub fn get(&self, section: &str, key: &str) -> Option<ConfigValue> {
        if let Some(raw) = self.env.get(&Self::env_var_name(section, key)) {
            return Some(ConfigValue::parse_env(raw));
        }

        self.file
            .as_ref()
            .and_then(|file| file.get(section, key))
            .cloned()
    }

    pub fn get_required(&self, section: &str, key: &str) -> ConfigResult<ConfigValue> {
        self.get(section, key).ok_or_else(|| ConfigError::NotFound {
            key: format!("{}.{}", section, key),
            env_var: Self::env_var_name(section, key),
        })
    }

    /// Value as text, `None` when absent or blank.
    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.get(section, key)
            .map(|v| v.to_string())
            .filter(|s| !s.trim().is_empty())
    }

    /// Value as the operator wrote it, without type coercion. `None` when
    /// absent or blank.
    pub fn get_raw(&self, section: &str, key: &str) -> Option<String> {
        let raw = match self.env.get(&Self::env_var_name(section, key)) {
            Some(raw) => raw.to_string(),
            None => self.file.as_ref()?.get(section, key)?.to_string(),
        };
        Some(raw).filter(|s| !s.trim().is_empty())
    }

    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> ConfigResult<bool> {
        match self.get(section, key) {
            None => Ok(default),
            Some(value) => value.as_bool().ok_or_else(|| ConfigError::InvalidValue {
                key: format!("{}.{}", section, key),
                message: format!("expected a boolean, got '{}'", value),
            }),
        }
    }

    pub fn get_i64(&self, section: &str, key: &str) -> ConfigResult<Option<i64>> {
        match self.get(section, key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: format!("{}.{}", section, key),
                    message: format!("expected an integer, got '{}'", value),
                }),
        }
    }
}
