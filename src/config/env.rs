//! Environment variable snapshot.
//!
//! Environment variables are read once into an immutable map. Mode detection
//! and config lookups run against the snapshot so a resolver sees one
//! consistent view.

use std::collections::HashMap;
use std::fmt;

/// Immutable name→value view of the process environment.
#[derive(Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Raw value, even if empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value with surrounding whitespace removed, `None` when empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.non_empty(key).is_some()
    }

    /// First non-empty value among `keys`.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.non_empty(key))
    }

    /// Returns `true` if the value is "1", "true" or "yes" (case-insensitive).
    pub fn flag(&self, key: &str) -> bool {
        self.non_empty(key)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
            .unwrap_or(false)
    }

    /// Iterate over variables whose name starts with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.vars
            .iter()
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Debug for EnvSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("EnvSnapshot").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_ignores_blank() {
        let env = EnvSnapshot::from_pairs([("A", ""), ("B", "  "), ("C", " x ")]);
        assert_eq!(env.get("A"), Some(""));
        assert_eq!(env.non_empty("A"), None);
        assert_eq!(env.non_empty("B"), None);
        assert_eq!(env.non_empty("C"), Some("x"));
        assert!(!env.is_set("MISSING"));
    }

    #[test]
    fn test_flag() {
        let env = EnvSnapshot::empty()
            .with("ONE", "1")
            .with("TRUE", "TRUE")
            .with("YES", "yes")
            .with("ZERO", "0")
            .with("FALSE", "false");

        assert!(env.flag("ONE"));
        assert!(env.flag("TRUE"));
        assert!(env.flag("YES"));
        assert!(!env.flag("ZERO"));
        assert!(!env.flag("FALSE"));
        assert!(!env.flag("NONEXISTENT"));
    }

    #[test]
    fn test_first_of() {
        let env = EnvSnapshot::from_pairs([("AWS_DEFAULT_REGION", "eu-west-1")]);
        assert_eq!(
            env.first_of(&["AWS_REGION", "AWS_DEFAULT_REGION"]),
            Some("eu-west-1")
        );
        assert_eq!(env.first_of(&["AWS_REGION"]), None);
    }

    #[test]
    fn test_debug_hides_values() {
        let env = EnvSnapshot::from_pairs([("AZURE_CLIENT_SECRET", "super-secret")]);
        let out = format!("{:?}", env);
        assert!(out.contains("AZURE_CLIENT_SECRET"));
        assert!(!out.contains("super-secret"));
    }
}
