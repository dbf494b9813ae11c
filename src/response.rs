//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it. Middleware receives the
//! same value on the way back out and may inspect or amend it.

use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http_body_util::Full;
use tracing::warn;

const TEXT: &str = "text/plain; charset=utf-8";
const JSON: &str = "application/json";

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use plait::{Response, StatusCode};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use plait::{Response, StatusCode};
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    body: Bytes,
    headers: HeaderMap,
    status: StatusCode,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Bytes::new(), headers: HeaderMap::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Appends a header. Invalid names or values are dropped with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(n), Ok(v)) => {
                self.headers.append(n, v);
            }
            _ => warn!(header = name, "dropping invalid response header"),
        }
        self
    }

    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(JSON, body.into())
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(TEXT, Bytes::from(body.into()))
    }

    /// Terminate with a body of any content type.
    pub fn bytes(self, content_type: &'static str, body: impl Into<Bytes>) -> Response {
        self.finish(content_type, body.into())
    }

    /// Terminate with no body (e.g. `204 No Content`, redirects).
    pub fn no_body(self) -> Response {
        Response { body: Bytes::new(), headers: self.headers, status: self.status }
    }

    fn finish(mut self, content_type: &'static str, body: Bytes) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response { body, headers: self.headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
/// `Result<T, E>` converts whichever side it holds, so handlers can use `?`
/// for expected failures instead of panicking.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl IntoResponse for (StatusCode, String) {
    fn into_response(self) -> Response {
        Response::builder().status(self.0).text(self.1)
    }
}

impl IntoResponse for (StatusCode, &'static str) {
    fn into_response(self) -> Response {
        Response::builder().status(self.0).text(self.1)
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_sets_content_type() {
        let res = Response::text("hi");
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.header("content-type"), Some(TEXT));
        assert_eq!(res.body(), b"hi");
    }

    #[test]
    fn result_converts_error_side() {
        let r: Result<&'static str, StatusCode> = Err(StatusCode::CONFLICT);
        assert_eq!(r.into_response().status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn builder_keeps_extra_headers() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(&b"{}"[..]);
        assert_eq!(res.header("location"), Some("/users/99"));
        assert_eq!(res.header("content-type"), Some(JSON));
        let inner = res.into_inner();
        assert_eq!(inner.status(), StatusCode::CREATED);
    }
}
