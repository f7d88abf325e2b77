// Dependency injection: fills every marked field from the bean registry

use crate::component::Injection;
use crate::container::BeanRegistry;
use crate::error::{Error, Result};
use crate::logging::{debug, trace, warn};

/// How the container treats injection sites it cannot resolve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerOptions {
    /// When `true`, an unresolved injection site aborts initialization.
    /// When `false` (the default) the field is left absent and a warning is logged.
    pub strict_injection: bool,
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            strict_injection: true,
        }
    }

    pub fn with_strict_injection(mut self, strict: bool) -> Self {
        self.strict_injection = strict;
        self
    }
}

/// An injection site left absent after wiring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedSite {
    pub bean: String,
    pub field: String,
    pub target: String,
}

/// Summary of one wiring pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WiringReport {
    pub injected: usize,
    pub unresolved: Vec<UnresolvedSite>,
}

impl WiringReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Second-pass wiring over an already-populated registry
#[derive(Debug, Clone, Default)]
pub struct Injector {
    options: ContainerOptions,
}

impl Injector {
    pub fn new(options: ContainerOptions) -> Self {
        Self { options }
    }

    /// Resolve and assign every injection site of every bean.
    ///
    /// Beans are processed in registry order. Each site resolves by its
    /// qualifier when non-empty, otherwise by its declared type name.
    pub fn wire(&self, registry: &BeanRegistry) -> Result<WiringReport> {
        let mut report = WiringReport::default();

        for bean in registry.beans() {
            for site in bean.descriptor().injection_sites() {
                let key = site.target_key();
                let target = registry.lookup(key);

                match site.assign(bean.object(), target) {
                    Injection::Injected => {
                        report.injected += 1;
                        trace!(
                            bean = bean.name(),
                            field = site.field(),
                            target = key,
                            "Dependency injected"
                        );
                    }
                    Injection::AlreadyWired => {
                        trace!(
                            bean = bean.name(),
                            field = site.field(),
                            "Field already wired, keeping existing value"
                        );
                    }
                    Injection::Unresolved => {
                        if self.options.strict_injection {
                            return Err(Error::UnresolvedDependency {
                                bean: bean.name().to_string(),
                                field: site.field().to_string(),
                                target: key.to_string(),
                            });
                        }
                        warn!(
                            bean = bean.name(),
                            field = site.field(),
                            target = key,
                            "Unresolved dependency left absent"
                        );
                        report.unresolved.push(UnresolvedSite {
                            bean: bean.name().to_string(),
                            field: site.field().to_string(),
                            target: key.to_string(),
                        });
                    }
                }
            }
        }

        debug!(
            injected = report.injected,
            unresolved = report.unresolved.len(),
            "Dependency wiring complete"
        );
        Ok(report)
    }
}
