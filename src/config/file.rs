//! File-based configuration.
//!
//! Loads a sectioned YAML file (`section: { key: value }`). Used as the
//! fallback layer behind environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigResult;
use super::manager::ConfigValue;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Other(serde::de::IgnoredAny),
}

impl RawValue {
    fn into_value(self) -> Option<ConfigValue> {
        match self {
            RawValue::Bool(b) => Some(ConfigValue::Bool(b)),
            RawValue::Int(i) => Some(ConfigValue::Int(i)),
            RawValue::Float(f) => Some(ConfigValue::Float(f)),
            RawValue::Str(s) => Some(ConfigValue::Str(s)),
            RawValue::Other(_) => None,
        }
    }
}

type RawSections = HashMap<String, Option<HashMap<String, RawValue>>>;

/// Parsed YAML configuration file.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    path: PathBuf,
    sections: HashMap<String, HashMap<String, ConfigValue>>,
}

impl FileConfig {
    /// Load from `path`. A missing file yields `Ok(None)`.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.path = path.to_path_buf();
        Ok(Some(config))
    }

    pub fn parse(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: RawSections = serde_yaml_bw::from_str(content)?;
        let sections = raw
            .into_iter()
            .map(|(section, entries)| {
                let values = entries
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(key, raw)| raw.into_value().map(|v| (key, v)))
                    .collect();
                (section, values)
            })
            .collect();

        Ok(Self {
            path: PathBuf::new(),
            sections,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&ConfigValue> {
        self.sections.get(section)?.get(key)
    }

    pub fn sections(&self) -> &HashMap<String, HashMap<String, ConfigValue>> {
        &self.sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let config = FileConfig::parse(
            "server:\n  url: https://osdu.example.com\n  timeout: 30\nlogging:\n  enabled: true\n",
        )
        .unwrap();

        assert_eq!(
            config.get("server", "url"),
            Some(&ConfigValue::Str("https://osdu.example.com".into()))
        );
        assert_eq!(config.get("server", "timeout"), Some(&ConfigValue::Int(30)));
        assert_eq!(
            config.get("logging", "enabled"),
            Some(&ConfigValue::Bool(true))
        );
        assert_eq!(config.get("logging", "level"), None);
    }

    #[test]
    fn test_parse_empty_and_null_sections() {
        assert!(FileConfig::parse("").unwrap().sections().is_empty());

        let config = FileConfig::parse("auth:\nserver:\n  url: x\n").unwrap();
        assert_eq!(config.get("auth", "mode"), None);
        assert!(config.get("server", "url").is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let result = FileConfig::load("/nonexistent/osdu/config.yaml").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server: [unclosed").unwrap();
        assert!(FileConfig::load(&path).is_err());
    }
}
