// HTTP request and response handles passed through the dispatcher

use crate::logging::warn;
use crate::routing::normalize_path;
use std::borrow::Cow;
use std::collections::HashMap;

/// Inbound request handle
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    /// Request path, without the query string
    pub path: String,
    /// Mount prefix the application is served under
    pub context_path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub query_params: HashMap<String, Vec<String>>,
}

impl HttpRequest {
    /// Create a request from a method and a request URI.
    ///
    /// Anything after `?` in `uri` is decoded into query parameters.
    pub fn new(method: impl Into<String>, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };

        let mut request = Self {
            method: method.into(),
            path: path.to_string(),
            ..Self::default()
        };
        if let Some(query) = query {
            request.query_params = parse_query_string(query);
        }
        request
    }

    pub fn get(uri: &str) -> Self {
        Self::new("GET", uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new("POST", uri)
    }

    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    /// Append one value to a query parameter
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn request_uri(&self) -> &str {
        &self.path
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// First value of a query parameter
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a query parameter, in arrival order
    pub fn query_values(&self, name: &str) -> Option<&[String]> {
        self.query_params.get(name).map(Vec::as_slice)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The path compared against the route table: the request URI with the
    /// mount prefix stripped and separator runs collapsed.
    ///
    /// `None` when the request is not under the mount prefix. The prefix
    /// only matches on a segment boundary.
    pub fn dispatch_path(&self) -> Option<String> {
        let prefix = self.context_path.trim_end_matches('/');
        if prefix.is_empty() {
            return Some(normalize_path(&self.path));
        }

        match self.path.strip_prefix(prefix)? {
            "" => Some("/".to_string()),
            rest if rest.starts_with('/') => Some(normalize_path(rest)),
            _ => None,
        }
    }
}

/// Outbound response handle
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Append text to the body
    pub fn write(&mut self, text: &str) {
        self.body.extend_from_slice(text.as_bytes());
    }

    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::ok()
    }
}

/// Decode a query string into a multi-valued parameter map
fn parse_query_string(query: &str) -> HashMap<String, Vec<String>> {
    let pairs: Vec<(String, String)> = match serde_urlencoded::from_str(query) {
        Ok(pairs) => pairs,
        Err(err) => {
            warn!(query, error = %err, "Discarding undecodable query string");
            Vec::new()
        }
    };

    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in pairs {
        params.entry(key).or_default().push(value);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_query() {
        let request = HttpRequest::get("/web/query?name=Alice");
        assert_eq!(request.request_uri(), "/web/query");
        assert_eq!(request.query("name"), Some("Alice"));
    }

    #[test]
    fn test_query_decoding() {
        let request = HttpRequest::get("/q?name=john%20doe&email=test%40example.com&x=a+b");
        assert_eq!(request.query("name"), Some("john doe"));
        assert_eq!(request.query("email"), Some("test@example.com"));
        assert_eq!(request.query("x"), Some("a b"));
    }

    #[test]
    fn test_multi_valued_query() {
        let request = HttpRequest::get("/q?tag=rust&tag=web");
        assert_eq!(
            request.query_values("tag"),
            Some(&["rust".to_string(), "web".to_string()][..])
        );
    }

    #[test]
    fn test_dispatch_path_strips_context() {
        let request = HttpRequest::get("/app//web///query").with_context_path("/app");
        assert_eq!(request.dispatch_path().as_deref(), Some("/web/query"));
    }

    #[test]
    fn test_dispatch_path_outside_mount() {
        let foreign = HttpRequest::get("/other/web/query").with_context_path("/app");
        assert_eq!(foreign.dispatch_path(), None);

        let unmounted = HttpRequest::get("/web/query").with_context_path("/app");
        assert_eq!(unmounted.dispatch_path(), None);

        let glued = HttpRequest::get("/appweb/query").with_context_path("/app");
        assert_eq!(glued.dispatch_path(), None);
    }

    #[test]
    fn test_dispatch_path_mount_root() {
        let request = HttpRequest::get("/app").with_context_path("/app");
        assert_eq!(request.dispatch_path().as_deref(), Some("/"));

        let unmounted = HttpRequest::get("//web/query");
        assert_eq!(unmounted.dispatch_path().as_deref(), Some("/web/query"));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let request = HttpRequest::get("/").with_header("Content-Type", "text/plain");
        assert_eq!(request.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_response_write_appends() {
        let mut response = HttpResponse::ok();
        response.write("3+4");
        response.write("=7");
        assert_eq!(response.body_text(), "3+4=7");
        response.clear_body();
        assert!(response.body.is_empty());
    }
}
