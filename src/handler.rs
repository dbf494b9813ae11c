//! Handler traits and type erasure.
//!
//! # How handlers are stored
//!
//! The router holds handlers of *different* types in one table, and
//! middleware must wrap any of them without knowing which. Both needs are met
//! by one type-erased value, [`Endpoint`], an `Arc<dyn Service>`.
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ composer.handle("/", hello)
//! hello.into_endpoint()                            ← Handler blanket impl
//!        ↓
//! Endpoint(Arc::new(FnHandler(hello)))             ← heap-allocated wrapper
//!        ↓ middleware.apply(endpoint)              ← once, at registration
//! endpoint.call(req)  at request time              ← one vtable dispatch per layer
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })  ← BoxFuture
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

// ── Service ───────────────────────────────────────────────────────────────────

/// The router-level handler abstraction.
///
/// Implement this on your own type when a plain `async fn` is not enough, for
/// example when the handler carries state:
///
/// ```rust
/// use plait::{BoxFuture, Request, Response, Service};
///
/// struct Greeter { name: String }
///
/// impl Service for Greeter {
///     fn call(&self, _req: Request) -> BoxFuture {
///         let body = format!("hello from {}", self.name);
///         Box::pin(async move { Response::text(body) })
///     }
/// }
/// ```
pub trait Service: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// A type-erased, cheaply cloneable handler.
///
/// This is what middleware receives as `next` and what it returns. Cloning
/// costs one atomic increment; calling costs one virtual dispatch.
#[derive(Clone)]
pub struct Endpoint(Arc<dyn Service>);

impl Endpoint {
    pub fn new(service: impl Service) -> Self {
        Self(Arc::new(service))
    }

    /// Runs the request through this endpoint and everything it wraps.
    pub fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }
}

impl Service for Endpoint {
    fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Endpoint")
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid terminal handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it. Types
/// that need more than a function should implement [`Service`] instead.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    fn into_endpoint(self) -> Endpoint;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint(self) -> Endpoint {
        Endpoint::new(FnHandler(self))
    }
}

/// Newtype bridging a concrete handler function to [`Service`].
struct FnHandler<F>(F);

impl<F, Fut, R> Service for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    async fn echo_path(req: Request) -> String {
        req.path().to_owned()
    }

    #[tokio::test]
    async fn fn_handler_converts_return_value() {
        let ep = echo_path.into_endpoint();
        let res = ep.call(Request::new(Method::Get, "/a/b")).await;
        assert_eq!(res.body(), b"/a/b");
    }

    #[tokio::test]
    async fn cloned_endpoints_share_the_handler() {
        let ep = echo_path.into_endpoint();
        let other = ep.clone();
        let res = other.call(Request::new(Method::Get, "/x")).await;
        assert_eq!(res.body(), b"/x");
    }
}
