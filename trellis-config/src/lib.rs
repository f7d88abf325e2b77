// Configuration management for the Trellis container

pub mod context;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use context::ContextConfig;
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Main configuration manager: a flat key-value store fed by files and
/// the environment. Later loads override earlier ones key by key.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: None,
        }
    }

    /// Create with an environment variable prefix such as `TRELLIS`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Value>> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;

        let mut config = self.write();
        for (key, value) in env_vars {
            debug!(key = %key, "Configuration overridden from environment");
            config.insert(key, Value::String(value));
        }

        Ok(())
    }

    /// Load configuration from a file in the given format
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;
        self.insert_object(data);
        debug!(path = %path.display(), format = ?format, "Configuration file loaded");
        Ok(())
    }

    /// Load configuration from a file, detecting the format from its extension
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.load_file(path, FileFormat::detect(path)?)
    }

    /// Load configuration from text in the given format
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.insert_object(data);
        Ok(())
    }

    fn insert_object(&self, data: Value) {
        if let Value::Object(map) = data {
            let mut config = self.write();
            for (key, value) in map {
                config.insert(key, value);
            }
        }
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        self.write().insert(key.to_string(), json_value);
        Ok(())
    }

    /// Get a configuration value, deserialized as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Get a value as text; numbers and booleans are rendered as written
    pub fn get_string(&self, key: &str) -> Result<String> {
        match self.read().get(key) {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(Value::Null) | None => Err(ConfigError::KeyNotFound(key.to_string())),
            Some(other) => Ok(other.to_string()),
        }
    }

    /// Get a value parsed from its text form.
    ///
    /// Works the same whether the source stored `"8080"` (properties,
    /// environment) or `8080` (JSON, TOML).
    pub fn get_parsed<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let text = self.get_string(key)?;
        text.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("{:?}: {}", text, e),
            })
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Get all configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Copy every entry of `other` into this manager, overriding existing keys
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.config, &other.config) {
            return;
        }
        let entries: Vec<(String, Value)> = other
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.write().extend(entries);
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("scanPackage", "web_demo").unwrap();

        let value: String = manager.get("scanPackage").unwrap();
        assert_eq!(value, "web_demo");
        assert!(matches!(
            manager.get::<String>("missing"),
            Err(ConfigError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();
        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
    }

    #[test]
    fn test_get_parsed_accepts_text_and_numbers() {
        let manager = ConfigManager::new();
        manager.set("fromText", "8080").unwrap();
        manager.set("fromNumber", 9090).unwrap();
        manager.set("flag", true).unwrap();
        manager.set("bad", "eighty").unwrap();

        assert_eq!(manager.get_parsed::<u16>("fromText").unwrap(), 8080);
        assert_eq!(manager.get_parsed::<u16>("fromNumber").unwrap(), 9090);
        assert!(manager.get_parsed::<bool>("flag").unwrap());
        assert!(matches!(
            manager.get_parsed::<u16>("bad"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_str_overrides() {
        let manager = ConfigManager::new();
        manager
            .load_str("scanPackage=first\nport=1", FileFormat::Properties)
            .unwrap();
        manager
            .load_str(r#"{"scanPackage": "second"}"#, FileFormat::Json)
            .unwrap();

        assert_eq!(manager.get_string("scanPackage").unwrap(), "second");
        assert_eq!(manager.get_string("port").unwrap(), "1");
    }

    #[test]
    fn test_merge() {
        let base = ConfigManager::new();
        base.set("a", 1).unwrap();
        let overrides = ConfigManager::new();
        overrides.set("a", 2).unwrap();
        overrides.set("b", 3).unwrap();

        base.merge(&overrides);
        base.merge(&base.clone());
        assert_eq!(base.get::<i64>("a").unwrap(), 2);
        assert!(base.has("b"));

        let mut keys = base.keys();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
