//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::method::Method;

/// Path parameters captured by the router, keyed by name.
pub type Params = HashMap<String, String>;

/// An incoming HTTP request with its body fully buffered.
///
/// The server builds these from hyper requests. Tests and callers that want
/// to drive a composed [`Endpoint`](crate::Endpoint) directly can build one
/// by hand:
///
/// ```rust
/// use plait::{Method, Request};
///
/// let req = Request::new(Method::Post, "/users")
///     .with_header("content-type", "application/json")
///     .with_body(r#"{"name":"alice"}"#);
/// assert_eq!(req.header("Content-Type"), Some("application/json"));
/// ```
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    /// A request with no headers, no body and no peer address.
    ///
    /// A `?query` suffix in `target` is split off into [`Request::query`].
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_owned(), Some(q.to_owned())),
            None => (target.to_owned(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Params::new(),
            remote_addr: None,
        }
    }

    pub(crate) fn from_parts(
        parts: http::request::Parts,
        method: Method,
        body: Bytes,
        remote_addr: SocketAddr,
    ) -> Self {
        Self {
            method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            params: Params::new(),
            remote_addr: Some(remote_addr),
        }
    }

    /// Adds a header. Names or values that are not valid HTTP are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(n), Ok(v)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(n, v);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The peer address, if the request came off a socket.
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Path plus query, as it appeared on the request line.
    pub fn uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
