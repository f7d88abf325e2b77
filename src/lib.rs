// Trellis - a minimal IoC container with a first-match HTTP dispatcher
//
// Components describe themselves (markers, constructor, capabilities,
// injection sites, handler methods) and register for discovery. At startup
// the container instantiates every marked component under the configured
// namespace, wires their dependencies and builds an ordered route table.

// Re-export core functionality
pub use trellis_core::*;

#[cfg(feature = "config")]
pub use trellis_config;

#[cfg(feature = "config")]
use trellis_config::{ConfigError, ContextConfig};

/// Failure to bring an application up from configuration
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Container error: {0}")]
    Container(#[from] trellis_core::Error),
}

/// Build an [`Application`] from the container settings.
///
/// Discovers components under `scanPackage` in `source`, applies the
/// injection mode and mounts the application under `contextPath`.
#[cfg(feature = "config")]
pub fn bootstrap(
    config: &ContextConfig,
    source: &dyn ComponentSource,
) -> std::result::Result<Application, BootstrapError> {
    let options = ContainerOptions::new().with_strict_injection(config.strict_injection);
    let application = Application::bootstrap(source, &config.scan_package, &options)?
        .with_context_path(&config.context_path);
    Ok(application)
}
