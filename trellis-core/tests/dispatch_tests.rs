// End-to-end dispatch through an initialized context

use std::sync::Arc;
use trellis_core::{
    ApplicationContext, Autowired, Catalog, ContainerOptions, Describe, DispatchOutcome,
    Dispatcher, Error, HttpRequest, HttpResponse, Invocation, NOT_FOUND_BODY, Param, ParamType,
    Result,
};

trait Arithmetic: Send + Sync {
    fn add(&self, a: i64, b: i64) -> Option<i64>;
}

#[derive(Default)]
struct Adder;

impl Arithmetic for Adder {
    fn add(&self, a: i64, b: i64) -> Option<i64> {
        a.checked_add(b)
    }
}

#[derive(Default)]
struct WebController {
    arithmetic: Autowired<dyn Arithmetic>,
}

impl WebController {
    fn query(&self, inv: &mut Invocation<'_>) -> Result<String> {
        Ok(format!("name={}", inv.text(0).unwrap_or("")))
    }

    fn add(&self, inv: &mut Invocation<'_>) -> Result<String> {
        let a = inv.require_integer(0)?;
        let b = inv.require_integer(1)?;
        let sum = self
            .arithmetic
            .require()?
            .add(a, b)
            .ok_or_else(|| Error::handler("integer overflow"))?;
        Ok(format!("{}+{}={}", a, b, sum))
    }

    fn write(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let path = inv
            .request(0)
            .map(|request| request.request_uri().to_string())
            .unwrap_or_default();
        let response = inv.response(1).ok_or(Error::MissingArgument(1))?;
        response.set_status(201);
        response.write(&path);
        Ok(())
    }

    fn fail(&self, _inv: &mut Invocation<'_>) -> Result<String> {
        Err(Error::handler("database unavailable"))
    }
}

fn dispatcher() -> Dispatcher {
    let catalog = Catalog::new()
        .with(
            "demo::web::WebController",
            Describe::<WebController>::new()
                .controller("")
                .request_mapping("web")
                .constructor(WebController::default)
                .autowired::<dyn Arithmetic>("arithmetic", "", |c| &c.arithmetic)
                .route("query", "/query", vec![Param::text("name")], WebController::query)
                .route(
                    "add",
                    "/add",
                    vec![Param::integer("a"), Param::integer("b")],
                    WebController::add,
                )
                .route(
                    "write",
                    "/write",
                    vec![Param::request(), Param::response()],
                    WebController::write,
                )
                .route("fail", "/fail", vec![], WebController::fail)
                .build(),
        )
        .with(
            "demo::service::Adder",
            Describe::<Adder>::new()
                .service("")
                .constructor(Adder::default)
                .implements::<dyn Arithmetic>(|it| it)
                .build(),
        );

    let context =
        ApplicationContext::initialize(&catalog, "demo", &ContainerOptions::default()).unwrap();
    Dispatcher::new(Arc::new(context))
}

fn get(dispatcher: &Dispatcher, uri: &str) -> (DispatchOutcome, HttpResponse) {
    let mut response = HttpResponse::default();
    let outcome = dispatcher.dispatch(&HttpRequest::get(uri), &mut response);
    (outcome, response)
}

#[test]
fn test_named_text_parameter_receives_literal_value() {
    let (outcome, response) = get(&dispatcher(), "/web/query?name=Alice");
    assert!(outcome.is_responded());
    assert_eq!(response.body_text(), "name=Alice");
}

#[test]
fn test_integer_parameters_are_summed() {
    let (_, response) = get(&dispatcher(), "/web/add?a=3&b=4");
    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), "3+4=7");
}

#[test]
fn test_unknown_path_is_not_found() {
    let (outcome, response) = get(&dispatcher(), "/web/unknown");
    assert!(matches!(outcome, DispatchOutcome::NotFound));
    assert_eq!(response.status, 404);
    assert_eq!(response.body_text(), NOT_FOUND_BODY);
}

#[test]
fn test_integer_overflow_is_an_error_response() {
    let (outcome, response) = get(&dispatcher(), "/web/add?a=9223372036854775807&b=1");

    assert!(matches!(outcome, DispatchOutcome::Failed(Error::Handler(_))));
    assert_eq!(response.status, 500);
    assert_eq!(
        response.body_text(),
        "500 Exception, Detail : Handler error: integer overflow"
    );
}

#[test]
fn test_non_numeric_integer_is_an_error_response() {
    let (outcome, response) = get(&dispatcher(), "/web/add?a=foo&b=4");

    assert!(matches!(
        outcome,
        DispatchOutcome::Failed(Error::TypeConversion { .. })
    ));
    assert_eq!(response.status, 500);
    let body = response.body_text();
    assert!(body.starts_with("500 Exception, Detail : "));
    assert!(body.contains("`a`"));
    assert!(!body.contains("3+"));
}

#[test]
fn test_handler_error_is_reported() {
    let (outcome, response) = get(&dispatcher(), "/web/fail");
    assert!(matches!(outcome, DispatchOutcome::Failed(Error::Handler(_))));
    assert_eq!(
        response.body_text(),
        "500 Exception, Detail : Handler error: database unavailable"
    );
}

#[test]
fn test_framework_handles_are_bound_by_type() {
    let dispatcher = dispatcher();
    let mut response = HttpResponse::default();
    let request = HttpRequest::post("/web/write?ignored=1");

    let outcome = dispatcher.dispatch(&request, &mut response);
    assert!(outcome.is_responded());
    assert_eq!(response.status, 201);
    assert_eq!(response.body_text(), "/web/write");
}

#[test]
fn test_get_and_post_dispatch_identically() {
    let dispatcher = dispatcher();

    let mut via_get = HttpResponse::default();
    dispatcher.dispatch(&HttpRequest::get("/web/add?a=1&b=2"), &mut via_get);
    let mut via_post = HttpResponse::default();
    dispatcher.dispatch(&HttpRequest::post("/web/add?a=1&b=2"), &mut via_post);

    assert_eq!(via_get.body, via_post.body);
    assert_eq!(via_get.status, via_post.status);
}

#[test]
fn test_context_path_is_stripped() {
    let dispatcher = dispatcher();
    let mut response = HttpResponse::default();
    let request = HttpRequest::get("/shop//web/query?name=Bob").with_context_path("/shop");

    dispatcher.dispatch(&request, &mut response);
    assert_eq!(response.body_text(), "name=Bob");
}

#[test]
fn test_request_outside_context_path_is_not_found() {
    let dispatcher = dispatcher();

    for uri in ["/web/add?a=1&b=2", "/shopweb/add?a=1&b=2", "/other/web/add?a=1&b=2"] {
        let mut response = HttpResponse::default();
        let request = HttpRequest::get(uri).with_context_path("/shop");

        let outcome = dispatcher.dispatch(&request, &mut response);
        assert!(matches!(outcome, DispatchOutcome::NotFound), "{}", uri);
        assert_eq!(response.status, 404);
        assert_eq!(response.body_text(), NOT_FOUND_BODY);
    }
}

#[test]
fn test_unbound_parameter_is_absent() {
    #[derive(Default)]
    struct Blank;

    let catalog = Catalog::new().with(
        "blank::Blank",
        Describe::<Blank>::new()
            .controller("")
            .constructor(Blank::default)
            .route(
                "blank",
                "/blank",
                vec![Param::unbound(ParamType::Text)],
                |_: &Blank, inv: &mut Invocation<'_>| Ok(inv.text(0).is_none()),
            )
            .build(),
    );
    let context =
        ApplicationContext::initialize(&catalog, "blank", &ContainerOptions::default()).unwrap();
    let (_, response) = get(&Dispatcher::new(Arc::new(context)), "/blank?0=x");
    assert_eq!(response.body_text(), "true");
}

#[test]
fn test_dispatcher_is_shared_across_threads() {
    let dispatcher = dispatcher();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            std::thread::spawn(move || {
                let (_, response) = get(&dispatcher, &format!("/web/add?a={}&b={}", i, i));
                response.body_text().into_owned()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("{}+{}={}", i, i, 2 * i));
    }
}
