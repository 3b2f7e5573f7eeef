//! # Configuration
//!
//! A minimal string key/value store mirroring the `app.set()` /
//! `app.get()` style. Applications layer values however they like; the
//! server crate fills it from well-known environment variables first and
//! then applies prefixed overrides:
//!
//! ```rust
//! use blog_core::BlogConfig;
//!
//! let mut config = BlogConfig::new();
//! config.set("paginate.default", "10");
//! config.set("paginate.max", "50");
//!
//! assert_eq!(config.get("paginate.default"), Some("10"));
//! assert_eq!(config.get_usize("paginate.max"), Some(50));
//! ```
//!
//! Overrides use a double underscore as the key separator:
//!
//! ```bash
//! export BLOG__PAGINATE__DEFAULT=25   # -> paginate.default
//! ```

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct BlogConfig {
    values: HashMap<String, String>,
}

impl BlogConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when it has no value yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// `true` unless `app.env` says production.
    pub fn is_production(&self) -> bool {
        self.get("app.env")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false)
    }

    /// Apply `PREFIX_A__B=value` pairs as `a.b = value`.
    pub fn load_env_overrides<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if !normalized.is_empty() {
                    self.set(normalized, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_are_normalized() {
        let mut config = BlogConfig::new();
        config.set("paginate.max", "100");

        config.load_env_overrides(
            "BLOG__",
            vec![
                ("BLOG__PAGINATE__MAX".to_string(), "50".to_string()),
                ("OTHER__THING".to_string(), "x".to_string()),
            ],
        );

        assert_eq!(config.get_usize("paginate.max"), Some(50));
        assert_eq!(config.get("other.thing"), None);
    }

    #[test]
    fn set_default_keeps_existing_values() {
        let mut config = BlogConfig::new();
        config.set("http.port", "8080");
        config.set_default("http.port", "3001");
        config.set_default("http.host", "0.0.0.0");

        assert_eq!(config.get("http.port"), Some("8080"));
        assert_eq!(config.get("http.host"), Some("0.0.0.0"));
    }

    #[test]
    fn production_flag() {
        let mut config = BlogConfig::new();
        assert!(!config.is_production());
        config.set("app.env", "Production");
        assert!(config.is_production());
    }
}
