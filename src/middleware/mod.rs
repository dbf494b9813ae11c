//! Middleware layer.
//!
//! A middleware turns one [`Endpoint`] into another, adding behavior before
//! and after the call to `next`. It is the right place for cross-cutting
//! concerns: panic recovery, structured access logs, timing, timeouts.
//!
//! Three ways to write one:
//!
//! ```rust
//! use plait::{Endpoint, Request, Response};
//! use plait::middleware::{self, Middleware};
//!
//! // 1. A type implementing `Middleware`.
//! struct Nothing;
//! impl Middleware for Nothing {
//!     fn apply(&self, next: Endpoint) -> Endpoint { next }
//! }
//!
//! // 2. Any `Fn(Endpoint) -> Endpoint` closure.
//! let identity = |next: Endpoint| next;
//!
//! // 3. An async function of the request and `next`.
//! let deny_anonymous = middleware::from_fn(|req: Request, next: Endpoint| async move {
//!     if req.header("authorization").is_none() {
//!         return Response::status(plait::StatusCode::UNAUTHORIZED);
//!     }
//!     next.call(req).await
//! });
//! ```
//!
//! Order is decided by the [`Composer`](crate::Composer): the first middleware
//! appended is the outermost layer.

mod access_log;
pub(crate) mod recover;
mod timeout;
mod timer;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, Endpoint, Service};
use crate::request::Request;
use crate::response::IntoResponse;

pub use access_log::AccessLog;
pub use recover::Recover;
pub use timeout::Timeout;
pub use timer::Timer;

/// A transformation from one endpoint to another.
///
/// `apply` runs once per registration, never per request. The endpoint it
/// returns is shared by every request on that route, so it must not keep
/// per-request state.
pub trait Middleware: Send + Sync + 'static {
    fn apply(&self, next: Endpoint) -> Endpoint;
}

impl<F> Middleware for F
where
    F: Fn(Endpoint) -> Endpoint + Send + Sync + 'static,
{
    fn apply(&self, next: Endpoint) -> Endpoint {
        self(next)
    }
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// Builds a middleware from an async function of `(Request, next)`.
///
/// Not calling `next` short-circuits the chain: nothing inside this layer runs.
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Endpoint) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn { f: Arc::new(f) }
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F> {
    f: Arc<F>,
}

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Endpoint) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn apply(&self, next: Endpoint) -> Endpoint {
        Endpoint::new(FromFnService { f: Arc::clone(&self.f), next })
    }
}

struct FromFnService<F> {
    f: Arc<F>,
    next: Endpoint,
}

impl<F, Fut, R> Service for FromFnService<F>
where
    F: Fn(Request, Endpoint) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.f)(req, self.next.clone());
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::method::Method;
    use crate::response::Response;
    use http::StatusCode;

    async fn ok(_req: Request) -> Response {
        Response::text("ok")
    }

    #[tokio::test]
    async fn from_fn_can_rewrite_the_response() {
        let mw = from_fn(|req: Request, next: Endpoint| async move {
            let mut res = next.call(req).await;
            res.headers_mut().insert("x-wrapped", http::HeaderValue::from_static("1"));
            res
        });
        let ep = mw.apply(ok.into_endpoint());
        let res = ep.call(Request::new(Method::Get, "/")).await;
        assert_eq!(res.header("x-wrapped"), Some("1"));
        assert_eq!(res.body(), b"ok");
    }

    #[tokio::test]
    async fn closure_middleware_applies() {
        let replace = |_next: Endpoint| (|_req: Request| async { StatusCode::GONE }).into_endpoint();
        let ep = replace.apply(ok.into_endpoint());
        let res = ep.call(Request::new(Method::Get, "/")).await;
        assert_eq!(res.status_code(), StatusCode::GONE);
    }
}
