//! Component discovery
//!
//! Components self-register a [`ComponentEntry`] at link time with
//! [`register_component!`](crate::register_component). Discovery walks those
//! entries (or an explicit [`Catalog`]) and yields the fully-qualified type
//! names reachable under a namespace, i.e. a module path such as
//! `my_app::web`. Sub-namespaces are included.

use crate::component::ComponentDescriptor;
use crate::error::{Error, Result};
use crate::logging::debug;

/// Source of component type names and their descriptors
pub trait ComponentSource {
    /// Fully-qualified names of every type under `namespace`, recursing into
    /// sub-namespaces, in a deterministic order.
    fn enumerate_type_names(&self, namespace: &str) -> Result<Vec<String>>;

    /// Descriptor for one type returned by [`enumerate_type_names`](Self::enumerate_type_names)
    fn describe(&self, type_name: &str) -> Option<ComponentDescriptor>;
}

/// A link-time component registration
pub struct ComponentEntry {
    /// Module path the component is declared in
    pub namespace: &'static str,
    /// Type name without module path
    pub name: &'static str,
    pub describe: fn() -> ComponentDescriptor,
}

inventory::collect!(ComponentEntry);

impl ComponentEntry {
    pub const fn new(
        namespace: &'static str,
        name: &'static str,
        describe: fn() -> ComponentDescriptor,
    ) -> Self {
        Self {
            namespace,
            name,
            describe,
        }
    }

    pub fn type_name(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }
}

/// Register a component for discovery.
///
/// The first argument is the type's name as written in the current module,
/// the second a function returning its descriptor.
///
/// ```ignore
/// trellis_core::register_component!(QueryController, QueryController::describe);
/// ```
#[macro_export]
macro_rules! register_component {
    ($ty:ident, $describe:expr) => {
        $crate::inventory::submit! {
            $crate::discovery::ComponentEntry::new(module_path!(), stringify!($ty), $describe)
        }
    };
}

/// Normalize a configured namespace to a module path.
///
/// Dotted names (`my_app.web`) are accepted and translated to `my_app::web`.
pub fn normalize_namespace(namespace: &str) -> String {
    let namespace = namespace.trim();
    let namespace = if namespace.contains("::") {
        namespace.to_string()
    } else {
        namespace.replace('.', "::")
    };
    namespace.trim_end_matches(':').to_string()
}

/// Whether `type_name` is declared under `namespace`
pub fn in_namespace(type_name: &str, namespace: &str) -> bool {
    if namespace.is_empty() {
        return true;
    }
    type_name
        .strip_prefix(namespace)
        .is_some_and(|rest| rest.starts_with("::"))
}

fn enumerate(names: impl Iterator<Item = String>, namespace: &str) -> Result<Vec<String>> {
    let namespace = normalize_namespace(namespace);
    let mut found: Vec<String> = names
        .filter(|type_name| in_namespace(type_name, &namespace))
        .collect();

    if found.is_empty() {
        return Err(Error::NamespaceNotFound(namespace));
    }

    found.sort();
    found.dedup();
    debug!(namespace = %namespace, count = found.len(), "Discovered component types");
    Ok(found)
}

/// Discovery over everything registered with `register_component!`
#[derive(Debug, Clone, Copy, Default)]
pub struct InventorySource;

impl InventorySource {
    pub fn new() -> Self {
        Self
    }
}

impl ComponentSource for InventorySource {
    fn enumerate_type_names(&self, namespace: &str) -> Result<Vec<String>> {
        enumerate(
            inventory::iter::<ComponentEntry>
                .into_iter()
                .map(ComponentEntry::type_name),
            namespace,
        )
    }

    fn describe(&self, type_name: &str) -> Option<ComponentDescriptor> {
        inventory::iter::<ComponentEntry>
            .into_iter()
            .find(|entry| entry.type_name() == type_name)
            .map(|entry| (entry.describe)())
    }
}

/// An explicit, in-memory component table
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<(String, ComponentDescriptor)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor under a fully-qualified type name
    pub fn register(&mut self, type_name: impl Into<String>, descriptor: ComponentDescriptor) {
        self.entries.push((type_name.into(), descriptor));
    }

    pub fn with(mut self, type_name: impl Into<String>, descriptor: ComponentDescriptor) -> Self {
        self.register(type_name, descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ComponentSource for Catalog {
    fn enumerate_type_names(&self, namespace: &str) -> Result<Vec<String>> {
        enumerate(self.entries.iter().map(|(name, _)| name.clone()), namespace)
    }

    fn describe(&self, type_name: &str) -> Option<ComponentDescriptor> {
        self.entries
            .iter()
            .find(|(name, _)| name == type_name)
            .map(|(_, descriptor)| descriptor.clone())
    }
}
