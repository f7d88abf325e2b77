// Route table: compiled path patterns bound to controller handler methods

use crate::component::HandlerMethod;
use crate::container::{Bean, BeanRegistry};
use crate::error::{Error, Result};
use crate::logging::{debug, info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Collapse every run of `/` into a single `/`
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        normalized.push(ch);
    }
    normalized
}

/// Effective route path: `/` + base + `/` + method path, normalized
pub fn join_paths(base: &str, path: &str) -> String {
    normalize_path(&format!("/{}/{}", base, path))
}

/// A compiled matcher over request paths.
///
/// The effective path is a regular expression that must match the whole
/// request path; plain literal paths therefore match only themselves.
#[derive(Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    pub fn compile(path: &str) -> Result<Self> {
        let regex =
            Regex::new(&format!("^(?:{})$", path)).map_err(|e| Error::InvalidRoutePattern {
                pattern: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: path.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RoutePattern").field(&self.source).finish()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Declared type of a handler parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// The inbound request handle
    Request,
    /// The outbound response handle
    Response,
    /// Integral value parsed from the query string
    Integer,
    /// Raw query string value
    Text,
    /// Any other declared type; receives the raw string
    Other(&'static str),
}

/// One declared handler parameter, optionally carrying a named-parameter marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: ParamType,
    pub name: Option<String>,
}

impl Param {
    pub fn request() -> Self {
        Self {
            ty: ParamType::Request,
            name: None,
        }
    }

    pub fn response() -> Self {
        Self {
            ty: ParamType::Response,
            name: None,
        }
    }

    pub fn named(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            ty,
            name: Some(name.into()),
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::named(name, ParamType::Integer)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::named(name, ParamType::Text)
    }

    /// A parameter with no marker; it always receives an absent value
    pub fn unbound(ty: ParamType) -> Self {
        Self { ty, name: None }
    }
}

/// Precomputed mapping from parameter names and framework-supplied types to
/// argument positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerBinding {
    param_types: Vec<ParamType>,
    named: HashMap<String, usize>,
    request_index: Option<usize>,
    response_index: Option<usize>,
}

impl HandlerBinding {
    pub fn from_params(params: &[Param]) -> Self {
        let mut binding = Self {
            param_types: params.iter().map(|param| param.ty).collect(),
            ..Self::default()
        };

        for (index, param) in params.iter().enumerate() {
            match param.ty {
                ParamType::Request => binding.request_index = Some(index),
                ParamType::Response => binding.response_index = Some(index),
                _ => {
                    let Some(name) = param.name.as_deref().map(str::trim) else {
                        continue;
                    };
                    if name.is_empty() {
                        continue;
                    }
                    if let Some(previous) = binding.named.insert(name.to_string(), index) {
                        warn!(
                            param = name,
                            previous, index, "Named parameter declared twice, last one wins"
                        );
                    }
                }
            }
        }

        binding
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.param_types.len()
    }

    pub fn param_type(&self, index: usize) -> Option<ParamType> {
        self.param_types.get(index).copied()
    }

    pub fn named_index(&self, name: &str) -> Option<usize> {
        self.named.get(name).copied()
    }

    pub fn named_params(&self) -> impl Iterator<Item = (&str, usize)> {
        self.named.iter().map(|(name, index)| (name.as_str(), *index))
    }

    pub fn request_index(&self) -> Option<usize> {
        self.request_index
    }

    pub fn response_index(&self) -> Option<usize> {
        self.response_index
    }

    /// Whether the parameter at `index` receives a value at invocation time
    pub fn is_bound(&self, index: usize) -> bool {
        self.request_index == Some(index)
            || self.response_index == Some(index)
            || self.named.values().any(|bound| *bound == index)
    }
}

/// A (pattern, owning bean, method, binding plan) entry
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: RoutePattern,
    pub bean: Bean,
    pub method: Arc<HandlerMethod>,
    pub binding: HandlerBinding,
}

/// Ordered route table; the first matching pattern wins
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile one route per handler method of every controller bean, in
    /// registry order and then declaration order.
    pub fn build(registry: &BeanRegistry) -> Result<Self> {
        let mut table = Self::new();

        for bean in registry.beans() {
            let descriptor = bean.descriptor();
            if !descriptor.is_controller() {
                continue;
            }

            let base = descriptor.base_path();
            for method in descriptor.handlers() {
                let path = join_paths(base, method.path());
                let pattern = RoutePattern::compile(&path)?;
                let handler = format!("{}::{}", descriptor.type_name(), method.name());
                info!(pattern = %pattern, method = %handler, "Mapped route");
                table.add_route(Route {
                    pattern,
                    bean: bean.clone(),
                    method: Arc::clone(method),
                    binding: HandlerBinding::from_params(method.params()),
                });
            }
        }

        debug!(route_count = table.len(), "Route table built");
        Ok(table)
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// First route, in registration order, whose pattern accepts `path`
    pub fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.pattern.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
