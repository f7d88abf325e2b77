//! Component descriptors
//!
//! A [`ComponentDescriptor`] is the declarative metadata one component type
//! carries: its type markers (`controller`, `service`, `request_mapping`),
//! a no-argument constructor, the capabilities (trait objects) it can be
//! viewed as, the fields that receive injected beans, and its handler
//! methods. Descriptors are built with [`Describe`] and consumed once by the
//! container at startup.
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{Autowired, ComponentDescriptor, Describe, Invocation, Param, Result};
//!
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! #[derive(Default)]
//! pub struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self, name: &str) -> String {
//!         format!("Hello, {name}")
//!     }
//! }
//!
//! #[derive(Default)]
//! pub struct GreetController {
//!     greeter: Autowired<dyn Greeter>,
//! }
//!
//! impl GreetController {
//!     fn hello(&self, inv: &mut Invocation<'_>) -> Result<String> {
//!         let name = inv.text(0).unwrap_or("stranger").to_string();
//!         Ok(self.greeter.require()?.greet(&name))
//!     }
//! }
//!
//! let service: ComponentDescriptor = Describe::<English>::new()
//!     .service("")
//!     .constructor(English::default)
//!     .implements::<dyn Greeter>(|english| english)
//!     .build();
//!
//! let controller: ComponentDescriptor = Describe::<GreetController>::new()
//!     .controller("")
//!     .request_mapping("greet")
//!     .constructor(GreetController::default)
//!     .autowired::<dyn Greeter>("greeter", "", |c| &c.greeter)
//!     .route("hello", "/hello", vec![Param::text("name")], GreetController::hello)
//!     .build();
//!
//! assert!(service.is_service());
//! assert_eq!(controller.bean_name(), "greetController");
//! ```

use crate::container::Bean;
use crate::dispatcher::Invocation;
use crate::error::{Error, Result};
use crate::routing::Param;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-erased handle to a component instance
pub type Object = Arc<dyn Any + Send + Sync>;

type View = Box<dyn Any + Send + Sync>;
type ViewFn<T> = Box<dyn Fn(&Arc<T>) -> View + Send + Sync>;
type Factory = Arc<dyn Fn() -> Instance + Send + Sync>;
type AssignFn = Arc<dyn Fn(&Object, Option<&Bean>) -> Injection + Send + Sync>;
type InvokeFn = Arc<dyn Fn(&Object, &mut Invocation<'_>) -> Result<Option<String>> + Send + Sync>;

/// A constructed component together with the typed views it exposes.
///
/// Every view is an `Arc<V>` stored as `dyn Any`, keyed by `TypeId::of::<V>()`,
/// where `V` is the concrete type or one of its capabilities.
pub struct Instance {
    object: Object,
    views: HashMap<TypeId, View>,
}

impl Instance {
    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn view<V: ?Sized + 'static>(&self) -> Option<Arc<V>> {
        self.views
            .get(&TypeId::of::<V>())
            .and_then(|view| view.downcast_ref::<Arc<V>>())
            .cloned()
    }
}

/// Markers attached to a component type.
///
/// `controller` and `service` hold the marker's name override; an empty
/// string means "derive the bean name from the type".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMarkers {
    pub controller: Option<String>,
    pub service: Option<String>,
    pub request_mapping: Option<String>,
}

/// A capability (trait object type) a component can be looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub name: &'static str,
    pub type_id: TypeId,
}

/// Result of assigning one injection site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    Injected,
    Unresolved,
    AlreadyWired,
}

/// A field marked for injection
#[derive(Clone)]
pub struct InjectionSite {
    field: &'static str,
    qualifier: String,
    declared_type: &'static str,
    assign: AssignFn,
}

impl InjectionSite {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    /// Registry key this site resolves against: the explicit qualifier when
    /// non-empty, otherwise the declared field type.
    pub fn target_key(&self) -> &str {
        let qualifier = self.qualifier.trim();
        if qualifier.is_empty() {
            self.declared_type
        } else {
            qualifier
        }
    }

    pub(crate) fn assign(&self, owner: &Object, target: Option<&Bean>) -> Injection {
        (self.assign)(owner, target)
    }
}

impl fmt::Debug for InjectionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionSite")
            .field("field", &self.field)
            .field("qualifier", &self.qualifier)
            .field("declared_type", &self.declared_type)
            .finish()
    }
}

/// A method carrying a route marker
pub struct HandlerMethod {
    name: &'static str,
    path: String,
    params: Vec<Param>,
    invoke: InvokeFn,
}

impl HandlerMethod {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn invoke(
        &self,
        owner: &Object,
        invocation: &mut Invocation<'_>,
    ) -> Result<Option<String>> {
        (self.invoke)(owner, invocation)
    }
}

impl fmt::Debug for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish()
    }
}

/// The full set of markers and hooks for one component type
#[derive(Clone)]
pub struct ComponentDescriptor {
    type_name: &'static str,
    markers: TypeMarkers,
    factory: Option<Factory>,
    capabilities: Vec<Capability>,
    injection_sites: Vec<InjectionSite>,
    handlers: Vec<Arc<HandlerMethod>>,
}

impl ComponentDescriptor {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without module path or generic arguments
    pub fn simple_name(&self) -> &'static str {
        simple_name(self.type_name)
    }

    pub fn markers(&self) -> &TypeMarkers {
        &self.markers
    }

    pub fn is_controller(&self) -> bool {
        self.markers.controller.is_some()
    }

    pub fn is_service(&self) -> bool {
        self.markers.service.is_some()
    }

    pub fn is_component(&self) -> bool {
        self.is_controller() || self.is_service()
    }

    pub fn base_path(&self) -> &str {
        self.markers.request_mapping.as_deref().unwrap_or("")
    }

    /// The bean name: a non-empty marker override, or the simple type name
    /// with its first character lower-cased.
    pub fn bean_name(&self) -> String {
        let explicit = self
            .markers
            .controller
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.markers
                    .service
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
            });

        match explicit {
            Some(name) => name.to_string(),
            None => lower_first(self.simple_name()),
        }
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn injection_sites(&self) -> &[InjectionSite] {
        &self.injection_sites
    }

    pub fn handlers(&self) -> &[Arc<HandlerMethod>] {
        &self.handlers
    }

    pub fn has_constructor(&self) -> bool {
        self.factory.is_some()
    }

    /// Construct a fresh instance with the no-argument constructor
    pub fn instantiate(&self) -> Result<Instance> {
        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| Error::MissingConstructor(self.type_name.to_string()))?;
        Ok(factory())
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type_name", &self.type_name)
            .field("markers", &self.markers)
            .field("has_constructor", &self.factory.is_some())
            .field("capabilities", &self.capabilities)
            .field("injection_sites", &self.injection_sites)
            .field("handlers", &self.handlers)
            .finish()
    }
}

/// Builder for a [`ComponentDescriptor`] of type `T`
pub struct Describe<T> {
    markers: TypeMarkers,
    constructor: Option<fn() -> T>,
    views: Vec<(TypeId, ViewFn<T>)>,
    capabilities: Vec<Capability>,
    injection_sites: Vec<InjectionSite>,
    handlers: Vec<Arc<HandlerMethod>>,
}

impl<T: Send + Sync + 'static> Describe<T> {
    pub fn new() -> Self {
        Self {
            markers: TypeMarkers::default(),
            constructor: None,
            views: Vec::new(),
            capabilities: Vec::new(),
            injection_sites: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Mark the type as a controller; `name` overrides the bean name when non-empty
    pub fn controller(mut self, name: &str) -> Self {
        self.markers.controller = Some(name.to_string());
        self
    }

    /// Mark the type as a service; `name` overrides the bean name when non-empty
    pub fn service(mut self, name: &str) -> Self {
        self.markers.service = Some(name.to_string());
        self
    }

    /// Base path prepended to every route of a controller
    pub fn request_mapping(mut self, base: &str) -> Self {
        self.markers.request_mapping = Some(base.to_string());
        self
    }

    pub fn constructor(mut self, constructor: fn() -> T) -> Self {
        self.constructor = Some(constructor);
        self
    }

    /// Declare that `T` satisfies the capability `C`, usually a `dyn Trait`.
    ///
    /// `cast` is normally the identity closure `|it| it`, which coerces
    /// `Arc<T>` into `Arc<C>`.
    pub fn implements<C>(mut self, cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.push(Capability {
            name: std::any::type_name::<C>(),
            type_id: TypeId::of::<C>(),
        });
        let view: ViewFn<T> =
            Box::new(move |object: &Arc<T>| Box::new(cast(Arc::clone(object))) as View);
        self.views.push((TypeId::of::<C>(), view));
        self
    }

    /// Mark a field for injection.
    ///
    /// The target is looked up by `qualifier` when it is non-empty, otherwise
    /// by the type name of `C`.
    pub fn autowired<C>(
        mut self,
        field: &'static str,
        qualifier: &str,
        slot: fn(&T) -> &Autowired<C>,
    ) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let assign = assigner(move |owner, target| {
            let Some(owner) = owner.downcast_ref::<T>() else {
                return Injection::Unresolved;
            };
            match target.and_then(Bean::resolve::<C>) {
                Some(dependency) => {
                    if slot(owner).fill(dependency) {
                        Injection::Injected
                    } else {
                        Injection::AlreadyWired
                    }
                }
                None => Injection::Unresolved,
            }
        });

        self.injection_sites.push(InjectionSite {
            field,
            qualifier: qualifier.to_string(),
            declared_type: std::any::type_name::<C>(),
            assign,
        });
        self
    }

    /// Declare a handler method reachable at `path` below the base path.
    ///
    /// `params` lists the method's parameters in positional order.
    pub fn route<R, F>(mut self, name: &'static str, path: &str, params: Vec<Param>, handler: F) -> Self
    where
        R: IntoBody,
        F: Fn(&T, &mut Invocation<'_>) -> Result<R> + Send + Sync + 'static,
    {
        let invoke = invoker(move |owner, invocation| {
            let owner = owner.downcast_ref::<T>().ok_or_else(|| {
                Error::Internal(format!(
                    "handler {} invoked on a foreign instance",
                    std::any::type_name::<T>()
                ))
            })?;
            handler(owner, invocation).map(IntoBody::into_body)
        });

        self.handlers.push(Arc::new(HandlerMethod {
            name,
            path: path.to_string(),
            params,
            invoke,
        }));
        self
    }

    pub fn build(self) -> ComponentDescriptor {
        let Describe {
            markers,
            constructor,
            views,
            capabilities,
            injection_sites,
            handlers,
        } = self;

        let factory = constructor.map(|constructor| {
            let factory: Factory = Arc::new(move || {
                let concrete = Arc::new(constructor());
                let mut instance_views: HashMap<TypeId, View> = HashMap::new();
                instance_views.insert(TypeId::of::<T>(), Box::new(Arc::clone(&concrete)));
                for (type_id, view) in &views {
                    instance_views.insert(*type_id, view(&concrete));
                }
                Instance {
                    object: concrete,
                    views: instance_views,
                }
            });
            factory
        });

        ComponentDescriptor {
            type_name: std::any::type_name::<T>(),
            markers,
            factory,
            capabilities,
            injection_sites,
            handlers,
        }
    }
}

impl<T: Send + Sync + 'static> Default for Describe<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn assigner<F>(assign: F) -> AssignFn
where
    F: Fn(&Object, Option<&Bean>) -> Injection + Send + Sync + 'static,
{
    Arc::new(assign)
}

fn invoker<F>(invoke: F) -> InvokeFn
where
    F: Fn(&Object, &mut Invocation<'_>) -> Result<Option<String>> + Send + Sync + 'static,
{
    Arc::new(invoke)
}

/// A set-once slot for an injected dependency.
///
/// The container fills it during wiring; it stays empty when the dependency
/// could not be resolved.
pub struct Autowired<C: ?Sized> {
    cell: OnceCell<Arc<C>>,
}

impl<C: ?Sized> Autowired<C> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<&Arc<C>> {
        self.cell.get()
    }

    /// The injected dependency, or [`Error::DependencyMissing`] when it was
    /// left absent at wiring time.
    pub fn require(&self) -> Result<&Arc<C>> {
        self.cell
            .get()
            .ok_or_else(|| Error::DependencyMissing(std::any::type_name::<C>().to_string()))
    }

    pub fn is_wired(&self) -> bool {
        self.cell.get().is_some()
    }

    fn fill(&self, dependency: Arc<C>) -> bool {
        self.cell.set(dependency).is_ok()
    }
}

impl<C: ?Sized> Default for Autowired<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> fmt::Debug for Autowired<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autowired")
            .field("type", &std::any::type_name::<C>())
            .field("wired", &self.is_wired())
            .finish()
    }
}

/// Conversion of a handler's return value into a response body.
///
/// `()` means the handler wrote its own body (or none).
pub trait IntoBody {
    fn into_body(self) -> Option<String>;
}

impl IntoBody for () {
    fn into_body(self) -> Option<String> {
        None
    }
}

impl IntoBody for String {
    fn into_body(self) -> Option<String> {
        Some(self)
    }
}

impl IntoBody for &'static str {
    fn into_body(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: IntoBody> IntoBody for Option<T> {
    fn into_body(self) -> Option<String> {
        self.and_then(IntoBody::into_body)
    }
}

macro_rules! display_body {
    ($($ty:ty),*) => {
        $(
            impl IntoBody for $ty {
                fn into_body(self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

display_body!(i32, i64, u32, u64, usize, f64, bool, char);

/// Strip the module path and generic arguments from a type name
pub(crate) fn simple_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Speaker: Send + Sync {
        fn speak(&self) -> String;
    }

    #[derive(Default)]
    struct LoudSpeaker;

    impl Speaker for LoudSpeaker {
        fn speak(&self) -> String {
            "HELLO".to_string()
        }
    }

    #[derive(Default)]
    struct Holder {
        speaker: Autowired<dyn Speaker>,
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("app::web::Controller"), "Controller");
        assert_eq!(simple_name("Controller"), "Controller");
        assert_eq!(simple_name("app::Wrapper<app::Inner>"), "Wrapper");
    }

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("QueryService"), "queryService");
        assert_eq!(lower_first("Ébène"), "ébène");
        assert_eq!(lower_first(""), "");
    }

    #[test]
    fn test_bean_name_defaults_to_type() {
        let descriptor = Describe::<LoudSpeaker>::new().service("").build();
        assert_eq!(descriptor.bean_name(), "loudSpeaker");
    }

    #[test]
    fn test_bean_name_override_is_trimmed() {
        let descriptor = Describe::<LoudSpeaker>::new().service("  speaker ").build();
        assert_eq!(descriptor.bean_name(), "speaker");

        let blank = Describe::<LoudSpeaker>::new().service("   ").build();
        assert_eq!(blank.bean_name(), "loudSpeaker");
    }

    #[test]
    fn test_instantiate_exposes_views() {
        let descriptor = Describe::<LoudSpeaker>::new()
            .service("")
            .constructor(LoudSpeaker::default)
            .implements::<dyn Speaker>(|it| it)
            .build();

        let instance = descriptor.instantiate().unwrap();
        assert!(instance.view::<LoudSpeaker>().is_some());
        assert_eq!(instance.view::<dyn Speaker>().unwrap().speak(), "HELLO");
        assert!(instance.view::<Holder>().is_none());
        assert_eq!(descriptor.capabilities()[0].name, std::any::type_name::<dyn Speaker>());
    }

    #[test]
    fn test_instantiate_without_constructor() {
        let descriptor = Describe::<LoudSpeaker>::new().service("").build();
        assert!(!descriptor.has_constructor());
        assert!(matches!(
            descriptor.instantiate(),
            Err(Error::MissingConstructor(_))
        ));
    }

    #[test]
    fn test_injection_site_target_key() {
        let by_type = Describe::<Holder>::new()
            .autowired::<dyn Speaker>("speaker", "", |h| &h.speaker)
            .build();
        assert_eq!(
            by_type.injection_sites()[0].target_key(),
            std::any::type_name::<dyn Speaker>()
        );

        let by_name = Describe::<Holder>::new()
            .autowired::<dyn Speaker>("speaker", " loud ", |h| &h.speaker)
            .build();
        assert_eq!(by_name.injection_sites()[0].target_key(), "loud");
    }

    #[test]
    fn test_autowired_fills_once() {
        let slot: Autowired<dyn Speaker> = Autowired::new();
        assert!(!slot.is_wired());
        assert!(matches!(slot.require(), Err(Error::DependencyMissing(_))));

        assert!(slot.fill(Arc::new(LoudSpeaker)));
        assert!(!slot.fill(Arc::new(LoudSpeaker)));
        assert_eq!(slot.require().unwrap().speak(), "HELLO");
    }

    #[test]
    fn test_into_body() {
        assert_eq!(().into_body(), None);
        assert_eq!("x".into_body(), Some("x".to_string()));
        assert_eq!(7i64.into_body(), Some("7".to_string()));
        assert_eq!(Some(true).into_body(), Some("true".to_string()));
        assert_eq!(None::<String>.into_body(), None);
    }
}
