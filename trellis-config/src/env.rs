// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Prefix of the environment variables read by [`EnvLoader::trellis`]
pub const DEFAULT_PREFIX: &str = "TRELLIS";

/// Environment variable loader.
///
/// Variable names are mapped to configuration keys by dropping the prefix
/// and converting the rest to camelCase: `TRELLIS_SCAN_PACKAGE` becomes
/// `scanPackage`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for the `TRELLIS_` variables
    pub fn trellis() -> Self {
        Self::new(Some(DEFAULT_PREFIX.to_string()))
    }

    /// Load every matching environment variable under its configuration key
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    fn collect(&self, vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
        let mut config = HashMap::new();

        for (name, value) in vars {
            let rest = match &self.prefix {
                Some(prefix) => match name
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('_'))
                {
                    Some(rest) => rest,
                    None => continue,
                },
                None => name.as_str(),
            };
            if rest.is_empty() {
                continue;
            }
            config.insert(to_config_key(rest), value);
        }

        config
    }

    /// Load the variable backing one configuration key
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Environment variable name for a configuration key: `scanPackage` -> `TRELLIS_SCAN_PACKAGE`
    pub fn var_name(&self, key: &str) -> String {
        let name = to_var_name(key);
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, name),
            None => name,
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// `SCAN_PACKAGE` -> `scanPackage`
fn to_config_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for (i, part) in name.split('_').filter(|part| !part.is_empty()).enumerate() {
        let lower = part.to_lowercase();
        if i == 0 {
            key.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                key.extend(first.to_uppercase());
                key.push_str(chars.as_str());
            }
        }
    }
    key
}

/// `scanPackage` -> `SCAN_PACKAGE`
fn to_var_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            name.push('_');
        }
        name.extend(ch.to_uppercase());
    }
    name
}
