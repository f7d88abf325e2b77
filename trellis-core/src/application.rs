// Application bootstrapper and HTTP server

use crate::context::ApplicationContext;
use crate::discovery::ComponentSource;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::injector::ContainerOptions;
use crate::logging::{debug, error, info};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Largest request body accepted by [`Application::serve`] unless overridden
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// The main application struct: an initialized container served over HTTP
pub struct Application {
    dispatcher: Dispatcher,
    context_path: Arc<str>,
    max_body_size: usize,
}

impl Application {
    /// Create an application around an already initialized context
    pub fn new(context: ApplicationContext) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::new(context)),
            context_path: Arc::from(""),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Initialize the container from the components under `scan_package`
    pub fn bootstrap(
        source: &dyn ComponentSource,
        scan_package: &str,
        options: &ContainerOptions,
    ) -> Result<Self> {
        info!("Bootstrapping Trellis application");
        let context = ApplicationContext::initialize(source, scan_package, options)?;
        info!("Application bootstrap complete");
        Ok(Self::new(context))
    }

    /// Serve the application under a mount prefix such as `/app`
    pub fn with_context_path(mut self, context_path: impl AsRef<str>) -> Self {
        self.context_path = Arc::from(context_path.as_ref().trim_end_matches('/'));
        self
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Reject request bodies larger than `limit` bytes with `413`
    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn context(&self) -> &ApplicationContext {
        self.dispatcher.context()
    }

    /// Start the HTTP server on the specified port
    pub async fn listen(self, port: u16) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener` until an accept error occurs
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!(address = %listener.local_addr()?, "Server listening");

        let dispatcher = self.dispatcher;
        let context_path = self.context_path;
        let max_body_size = self.max_body_size;

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let dispatcher = dispatcher.clone();
            let context_path = Arc::clone(&context_path);

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let dispatcher = dispatcher.clone();
                    let context_path = Arc::clone(&context_path);
                    async move {
                        handle_request(req, &dispatcher, &context_path, max_body_size).await
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!(peer = %peer, error = ?err, "Error serving connection");
                }
            });
        }
    }
}

/// Handle an incoming HTTP request
async fn handle_request(
    req: Request<IncomingBody>,
    dispatcher: &Dispatcher,
    context_path: &str,
    max_body_size: usize,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = HttpRequest::new(method.as_str(), &uri).with_context_path(context_path);
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request.headers.insert(name.to_string(), value.to_string());
        }
    }

    let mut response = HttpResponse::default();
    match read_body(req.into_body(), max_body_size).await? {
        Ok(body) => request.body = body,
        Err(err) => {
            debug!(error = %err, "Request body rejected");
            response.set_status(err.status_code());
            response.write(&err.to_string());
            return Ok(into_hyper(response));
        }
    }

    if method == Method::GET || method == Method::POST {
        match dispatcher.dispatch(&request, &mut response) {
            DispatchOutcome::Responded => debug!(status = response.status, "Request handled"),
            DispatchOutcome::NotFound => debug!(path = %request.path, "Request not routed"),
            DispatchOutcome::Failed(_) => {}
        }
    } else {
        let err = Error::MethodNotAllowed(method.to_string());
        response.set_status(err.status_code());
        response.write(&err.to_string());
        response
            .headers
            .insert("allow".to_string(), "GET, POST".to_string());
    }

    Ok(into_hyper(response))
}

/// Collect at most `limit` bytes of body.
///
/// Transport failures are returned as the outer error; an oversized body
/// becomes `Error::PayloadTooLarge`.
async fn read_body<B>(
    body: B,
    limit: usize,
) -> std::result::Result<Result<Vec<u8>>, hyper::Error>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(Ok(collected.to_bytes().to_vec())),
        Err(err) => match err.downcast::<hyper::Error>() {
            Ok(err) => Err(*err),
            Err(err) if err.is::<LengthLimitError>() => Ok(Err(Error::PayloadTooLarge(format!(
                "body exceeds {} bytes",
                limit
            )))),
            Err(err) => Ok(Err(Error::Internal(err.to_string()))),
        },
    }
}

/// Convert our HttpResponse into a hyper Response
fn into_hyper(response: HttpResponse) -> Response<Full<Bytes>> {
    let HttpResponse {
        status,
        headers,
        body,
    } = response;

    let mut hyper_response = Response::new(Full::new(Bytes::from(body)));
    *hyper_response.status_mut() =
        http::StatusCode::from_u16(status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

    let map = hyper_response.headers_mut();
    for (key, value) in headers {
        match (
            http::header::HeaderName::try_from(key.as_str()),
            http::header::HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => debug!(header = %key, "Dropping invalid response header"),
        }
    }
    if !map.contains_key(http::header::CONTENT_TYPE) {
        map.insert(
            http::header::CONTENT_TYPE,
            http::header::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
    }
    hyper_response
}
