//! # Configuration
//!
//! A minimal string key/value store, mirroring Feathers' `app.set()` /
//! `app.get()` API. Applications layer defaults first and then environment
//! overrides:
//!
//! ```rust
//! use taller_core::TallerConfig;
//!
//! let mut config = TallerConfig::new();
//! config.set("paginate.default", "50");
//! config.load_env_pairs("TALLER__", [("TALLER__PAGINATE__DEFAULT", "25")]);
//!
//! assert_eq!(config.get("paginate.default"), Some("25"));
//! ```
//!
//! `TALLER__PAGINATE__DEFAULT` maps to `paginate.default`: the prefix is
//! stripped, the rest lower-cased and `__` becomes `.`.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct TallerConfig {
    values: HashMap<String, String>,
}

impl TallerConfig {
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

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Apply `PREFIX__SECTION__KEY=value` pairs as `section.key`.
    pub fn load_env_pairs<I, K, V>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.as_ref().strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if !normalized.is_empty() {
                    self.values.insert(normalized, value.into());
                }
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_env_pairs(prefix, std::env::vars());
    }

    pub fn snapshot(&self) -> TallerConfigSnapshot {
        TallerConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable copy handed to hooks and services.
#[derive(Debug, Clone, Default)]
pub struct TallerConfigSnapshot {
    map: HashMap<String, String>,
}

impl TallerConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}
