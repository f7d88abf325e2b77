//! Request dispatch
//!
//! One call to [`Dispatcher::dispatch`] takes a request through
//! MATCHING, BINDING, INVOKING and RESPONDING, or stops early at a
//! not-found or error response. The dispatcher only reads the context it
//! was built from, so it can be shared by any number of connection tasks.

use crate::context::ApplicationContext;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::{debug, error};
use crate::routing::{HandlerBinding, ParamType, Route};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug_span;

/// Body of the response sent when no route matches
pub const NOT_FOUND_BODY: &str = "404 Not Found!";

/// One bound argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// No binding, or no matching query parameter on the request
    Absent,
    Request,
    Response,
    Integer(i64),
    Text(String),
}

/// The argument list for one handler call, plus the request and response
/// handles the framework-supplied parameters refer to.
pub struct Invocation<'a> {
    request: &'a HttpRequest,
    response: &'a mut HttpResponse,
    args: Vec<Arg>,
}

impl<'a> Invocation<'a> {
    pub fn new(request: &'a HttpRequest, response: &'a mut HttpResponse, args: Vec<Arg>) -> Self {
        Self {
            request,
            response,
            args,
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn arg(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn integer(&self, index: usize) -> Option<i64> {
        match self.args.get(index) {
            Some(Arg::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        match self.args.get(index) {
            Some(Arg::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// The request handle, if parameter `index` is bound to it
    pub fn request(&self, index: usize) -> Option<&HttpRequest> {
        match self.args.get(index) {
            Some(Arg::Request) => Some(self.request),
            _ => None,
        }
    }

    /// The response handle, if parameter `index` is bound to it
    pub fn response(&mut self, index: usize) -> Option<&mut HttpResponse> {
        match self.args.get(index) {
            Some(Arg::Response) => Some(&mut *self.response),
            _ => None,
        }
    }

    pub fn require_integer(&self, index: usize) -> Result<i64> {
        self.integer(index).ok_or(Error::MissingArgument(index))
    }

    pub fn require_text(&self, index: usize) -> Result<&str> {
        self.text(index).ok_or(Error::MissingArgument(index))
    }
}

/// Build the argument list for one request.
///
/// Every query parameter whose name is bound is converted according to the
/// declared type; values of a repeated parameter are joined with `,` first.
pub fn bind(binding: &HandlerBinding, request: &HttpRequest) -> Result<Vec<Arg>> {
    let mut args = vec![Arg::Absent; binding.arity()];

    for (name, values) in &request.query_params {
        let Some(index) = binding.named_index(name) else {
            continue;
        };
        let raw = values.join(",");
        args[index] = convert(name, raw, binding.param_type(index))?;
    }

    if let Some(index) = binding.request_index() {
        args[index] = Arg::Request;
    }
    if let Some(index) = binding.response_index() {
        args[index] = Arg::Response;
    }

    Ok(args)
}

fn convert(name: &str, raw: String, ty: Option<ParamType>) -> Result<Arg> {
    match ty {
        Some(ParamType::Integer) => {
            raw.parse::<i64>()
                .map(Arg::Integer)
                .map_err(|e| Error::TypeConversion {
                    param: name.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(Arg::Text(raw)),
    }
}

/// Terminal state of one dispatch
#[derive(Debug)]
pub enum DispatchOutcome {
    Responded,
    NotFound,
    Failed(Error),
}

impl DispatchOutcome {
    pub fn is_responded(&self) -> bool {
        matches!(self, DispatchOutcome::Responded)
    }
}

/// Routes requests to controller handler methods
#[derive(Clone)]
pub struct Dispatcher {
    context: Arc<ApplicationContext>,
}

impl Dispatcher {
    pub fn new(context: Arc<ApplicationContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ApplicationContext {
        &self.context
    }

    /// Serve one request, writing status and body into `response`
    pub fn dispatch(&self, request: &HttpRequest, response: &mut HttpResponse) -> DispatchOutcome {
        let span = debug_span!("dispatch", method = %request.method, path = %request.path);
        let _enter = span.enter();

        let route = request
            .dispatch_path()
            .and_then(|path| self.context.routes().find(&path));
        let Some(route) = route else {
            debug!("No route matched");
            response.clear_body();
            response.set_status(404);
            response.write(NOT_FOUND_BODY);
            return DispatchOutcome::NotFound;
        };

        debug!(pattern = %route.pattern, handler = route.method.name(), "Route matched");
        match invoke(route, request, response) {
            Ok(()) => DispatchOutcome::Responded,
            Err(err) => {
                error!(error = %err, handler = route.method.name(), "Request failed");
                response.clear_body();
                response.set_status(500);
                response.write(&format!("500 Exception, Detail : {}", err));
                DispatchOutcome::Failed(err)
            }
        }
    }
}

fn invoke(route: &Route, request: &HttpRequest, response: &mut HttpResponse) -> Result<()> {
    let args = bind(&route.binding, request)?;

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut invocation = Invocation::new(request, &mut *response, args);
        route.method.invoke(route.bean.object(), &mut invocation)
    }));
    let body = match result {
        Ok(body) => body?,
        Err(payload) => return Err(Error::HandlerPanicked(panic_message(payload.as_ref()))),
    };

    if let Some(body) = body {
        response.write(&body);
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
