// Bean registry: named component instances, also indexed by capability

use crate::component::{ComponentDescriptor, Instance, Object};
use crate::discovery::ComponentSource;
use crate::error::{Error, Result};
use crate::logging::{debug, trace};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

struct BeanInner {
    name: String,
    descriptor: ComponentDescriptor,
    instance: Instance,
}

/// One instantiated, named component.
///
/// Cloning a `Bean` clones the handle; both clones refer to the same instance.
#[derive(Clone)]
pub struct Bean {
    inner: Arc<BeanInner>,
}

impl Bean {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn declared_type(&self) -> &'static str {
        self.inner.descriptor.type_name()
    }

    /// Capability names this bean was published under
    pub fn capabilities(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.inner
            .descriptor
            .capabilities()
            .iter()
            .map(|capability| capability.name)
    }

    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.inner.descriptor
    }

    pub fn object(&self) -> &Object {
        self.inner.instance.object()
    }

    /// View the instance as `T`: its concrete type or one of its capabilities
    pub fn resolve<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.inner.instance.view::<T>()
    }

    pub fn ptr_eq(&self, other: &Bean) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Bean {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Bean {}

impl fmt::Debug for Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bean")
            .field("name", &self.inner.name)
            .field("declared_type", &self.declared_type())
            .finish()
    }
}

/// The container's bean table.
///
/// Every bean is stored under its name; service beans are additionally
/// stored under the name of each capability they implement. Iteration
/// follows registration order.
#[derive(Default)]
pub struct BeanRegistry {
    beans: Vec<Bean>,
    index: HashMap<String, Bean>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        debug!("Creating new bean registry");
        Self::default()
    }

    /// Register one discovered candidate.
    ///
    /// Returns `Ok(None)` when the type carries neither the controller nor the
    /// service marker.
    pub fn register(
        &mut self,
        type_name: &str,
        source: &dyn ComponentSource,
    ) -> Result<Option<Bean>> {
        let descriptor = source
            .describe(type_name)
            .ok_or_else(|| Error::ComponentNotFound(type_name.to_string()))?;
        self.register_descriptor(descriptor)
    }

    pub fn register_descriptor(&mut self, descriptor: ComponentDescriptor) -> Result<Option<Bean>> {
        if !descriptor.is_component() {
            trace!(component = descriptor.type_name(), "Skipping unmarked type");
            return Ok(None);
        }

        let name = descriptor.bean_name();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateBean(name));
        }

        let capability_keys: Vec<&'static str> = if descriptor.is_service() {
            descriptor
                .capabilities()
                .iter()
                .map(|capability| capability.name)
                .collect()
        } else {
            Vec::new()
        };
        for key in &capability_keys {
            if let Some(existing) = self.index.get(*key) {
                return Err(Error::CapabilityAlreadyBound {
                    capability: key.to_string(),
                    existing: existing.name().to_string(),
                });
            }
            if *key == name {
                return Err(Error::DuplicateBean(name));
            }
        }

        let instance = descriptor.instantiate()?;
        let bean = Bean {
            inner: Arc::new(BeanInner {
                name: name.clone(),
                descriptor,
                instance,
            }),
        };

        self.index.insert(name.clone(), bean.clone());
        for key in capability_keys {
            self.index.insert(key.to_string(), bean.clone());
            trace!(bean = %name, capability = key, "Capability bound");
        }
        self.beans.push(bean.clone());

        debug!(bean = %name, component = bean.declared_type(), "Bean registered");
        Ok(Some(bean))
    }

    /// Look a bean up by name or capability key
    pub fn lookup(&self, key: &str) -> Option<&Bean> {
        self.index.get(key)
    }

    /// Look a bean up and view it as `T`
    pub fn resolve<T: ?Sized + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.lookup(key).and_then(Bean::resolve::<T>)
    }

    /// Look a bean up by the type name of capability `C`
    pub fn resolve_capability<C: ?Sized + 'static>(&self) -> Option<Arc<C>> {
        self.resolve::<C>(std::any::type_name::<C>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Beans in registration order
    pub fn beans(&self) -> impl Iterator<Item = &Bean> {
        self.beans.iter()
    }

    /// All registry keys: bean names and capability names
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.beans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }
}

impl fmt::Debug for BeanRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanRegistry")
            .field("beans", &self.beans)
            .finish()
    }
}
