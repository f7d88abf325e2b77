// Container initialization: discovery, registration, wiring, route table

use crate::container::{Bean, BeanRegistry};
use crate::discovery::{normalize_namespace, ComponentSource};
use crate::error::Result;
use crate::injector::{ContainerOptions, Injector, WiringReport};
use crate::logging::{debug, info};
use crate::routing::RouteTable;
use std::sync::Arc;

/// The fully initialized container.
///
/// Built once by [`ApplicationContext::initialize`] and immutable afterwards,
/// so it can be shared across request tasks behind an `Arc` without locking.
/// Initialization itself is single-threaded and meant to run once.
#[derive(Debug)]
pub struct ApplicationContext {
    registry: BeanRegistry,
    routes: RouteTable,
    wiring: WiringReport,
}

impl ApplicationContext {
    /// Discover every component under `scan_package`, register the marked
    /// ones, wire their dependencies and build the route table.
    ///
    /// Any configuration error aborts initialization.
    pub fn initialize(
        source: &dyn ComponentSource,
        scan_package: &str,
        options: &ContainerOptions,
    ) -> Result<Self> {
        let namespace = normalize_namespace(scan_package);
        info!(namespace = %namespace, "Initializing application context");

        let type_names = source.enumerate_type_names(&namespace)?;
        let mut registry = BeanRegistry::new();
        for type_name in &type_names {
            registry.register(type_name, source)?;
        }
        debug!(
            candidates = type_names.len(),
            beans = registry.len(),
            "Component registration complete"
        );

        Self::from_registry(registry, options)
    }

    /// Wire and route an already-populated registry
    pub fn from_registry(registry: BeanRegistry, options: &ContainerOptions) -> Result<Self> {
        let wiring = Injector::new(options.clone()).wire(&registry)?;
        let routes = RouteTable::build(&registry)?;

        info!(
            beans = registry.len(),
            routes = routes.len(),
            unresolved = wiring.unresolved.len(),
            "Application context ready"
        );
        Ok(Self {
            registry,
            routes,
            wiring,
        })
    }

    pub fn registry(&self) -> &BeanRegistry {
        &self.registry
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Outcome of the injection pass
    pub fn wiring(&self) -> &WiringReport {
        &self.wiring
    }

    pub fn bean(&self, key: &str) -> Option<&Bean> {
        self.registry.lookup(key)
    }

    pub fn resolve<T: ?Sized + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.registry.resolve::<T>(key)
    }
}
