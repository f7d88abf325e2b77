// Typed view of the container bootstrap settings

use crate::{ConfigError, ConfigManager, ConfigValidator, Result, Validate};
use std::path::Path;

pub const SCAN_PACKAGE: &str = "scanPackage";
pub const CONTEXT_PATH: &str = "contextPath";
pub const PORT: &str = "port";
pub const STRICT_INJECTION: &str = "strictInjection";

pub const DEFAULT_PORT: u16 = 8080;

/// Settings the container needs at startup.
///
/// `scanPackage` is required; everything else has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Root namespace to discover components under
    pub scan_package: String,
    /// Mount prefix stripped from request paths
    pub context_path: String,
    pub port: u16,
    /// Fail startup on an unresolved injection site
    pub strict_injection: bool,
}

impl ContextConfig {
    pub fn new(scan_package: impl Into<String>) -> Self {
        Self {
            scan_package: scan_package.into(),
            context_path: String::new(),
            port: DEFAULT_PORT,
            strict_injection: false,
        }
    }

    /// Read and validate the settings held by `manager`
    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let scan_package = match manager.get_string(SCAN_PACKAGE) {
            Ok(value) => value.trim().to_string(),
            Err(ConfigError::KeyNotFound(_)) => {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be configured",
                    SCAN_PACKAGE
                )));
            }
            Err(e) => return Err(e),
        };

        let config = Self {
            scan_package,
            context_path: optional(manager.get_string(CONTEXT_PATH))?
                .map(|path| path.trim().trim_end_matches('/').to_string())
                .unwrap_or_default(),
            port: optional(manager.get_parsed(PORT))?.unwrap_or(DEFAULT_PORT),
            strict_injection: optional(manager.get_parsed(STRICT_INJECTION))?.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, then apply `TRELLIS_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let manager = ConfigManager::with_prefix(crate::env::DEFAULT_PREFIX);
        if let Some(path) = path {
            manager.load_path(path)?;
        }
        manager.load_env()?;
        Self::from_manager(&manager)
    }
}

fn optional<T>(value: Result<T>) -> Result<Option<T>> {
    match value {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::KeyNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl Validate for ContextConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.scan_package, SCAN_PACKAGE)?;
        ConfigValidator::is_mount_path(&self.context_path, CONTEXT_PATH)?;
        ConfigValidator::is_port(self.port, PORT)?;
        Ok(())
    }
}
