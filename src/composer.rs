//! Middleware composition.
//!
//! A [`Composer`] accumulates middleware and registers handlers on a
//! [`Mux`]. Each registration folds the *current* middleware list around the
//! handler once and stores the result; later appends only affect later
//! registrations.
//!
//! ```text
//! with(A).with(B).with(C); handle("/x", h)
//!
//!   endpoint = A.apply(B.apply(C.apply(h)))
//!
//!   request ─▶ A ─▶ B ─▶ C ─▶ h
//!   response ◀─ A ◀─ B ◀─ C ◀─┘
//! ```
//!
//! Setup is single-threaded by construction: every mutating method takes
//! `&mut self`, and serving consumes the router.

use std::sync::Arc;

use crate::error::Error;
use crate::handler::{Endpoint, Handler, Service};
use crate::method::Method;
use crate::middleware::Middleware;
use crate::router::{Mux, Router};
use crate::server::Server;
use crate::tls;

/// Ordered middleware plus the router endpoints are registered on.
///
/// ```rust,no_run
/// use plait::{Composer, Request, Response};
/// use plait::middleware::{AccessLog, Recover, Timer};
///
/// # async fn run() -> Result<(), plait::Error> {
/// let mut app = Composer::new();
/// app.with(Timer).with(Recover).with(AccessLog);
/// app.handle("/hello", hello)?
///    .handle("/world", world)?;
/// app.serve("0.0.0.0:3000").await
/// # }
/// async fn hello(_req: Request) -> Response { Response::text("Hello") }
/// async fn world(_req: Request) -> Response { Response::text("World") }
/// ```
pub struct Composer<M = Router> {
    mux: M,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Composer<Router> {
    /// A composer over a fresh default [`Router`].
    pub fn new() -> Self {
        Self::with_mux(Router::new())
    }
}

impl Default for Composer<Router> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Mux> Composer<M> {
    /// A composer registering on a caller-supplied router.
    pub fn with_mux(mux: M) -> Self {
        Self { mux, middleware: Vec::new() }
    }

    /// Appends one middleware. It wraps everything appended after it.
    pub fn with(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Appends several middleware in iteration order.
    pub fn with_all<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.middleware.extend(middleware);
        self
    }

    /// The middleware appended so far, outermost first.
    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    /// Wraps `endpoint` in the current middleware, first-appended outermost.
    pub fn compose(&self, endpoint: Endpoint) -> Endpoint {
        compose(&self.middleware, endpoint)
    }

    /// Composes `handler` and binds it to `pattern` for every method.
    ///
    /// # Errors
    ///
    /// Returns whatever the router reports, e.g. [`Error::Route`] for a
    /// duplicate pattern. The middleware list is never changed.
    pub fn handle(&mut self, pattern: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.register(None, pattern, handler.into_endpoint())
    }

    /// Like [`handle`](Self::handle), restricted to one method.
    ///
    /// # Errors
    ///
    /// Returns whatever the router reports.
    pub fn on(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, Error> {
        self.register(Some(method), pattern, handler.into_endpoint())
    }

    /// Like [`handle`](Self::handle), for a router-level [`Service`].
    ///
    /// # Errors
    ///
    /// Returns whatever the router reports.
    pub fn handle_service(
        &mut self,
        pattern: &str,
        service: impl Service,
    ) -> Result<&mut Self, Error> {
        self.register(None, pattern, Endpoint::new(service))
    }

    fn register(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        endpoint: Endpoint,
    ) -> Result<&mut Self, Error> {
        let composed = compose(&self.middleware, endpoint);
        self.mux.register(method, pattern, composed)?;
        Ok(self)
    }

    pub fn mux(&self) -> &M {
        &self.mux
    }

    /// Gives up the composer and returns its router, e.g. for [`Server::serve`].
    pub fn into_mux(self) -> M {
        self.mux
    }

    /// Serves this composer's router on `addr` until a shutdown signal.
    ///
    /// # Errors
    ///
    /// Propagates bind failures from the server unchanged.
    pub async fn serve(self, addr: &str) -> Result<(), Error> {
        Server::bind(addr).serve(self.mux).await
    }

    /// Serves `mux` instead of this composer's router.
    ///
    /// # Errors
    ///
    /// Propagates bind failures from the server unchanged.
    pub async fn serve_with<O: Mux>(self, addr: &str, mux: O) -> Result<(), Error> {
        Server::bind(addr).serve(mux).await
    }

    /// Serves over TLS with a PEM certificate chain and private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate or key cannot be loaded, or if
    /// binding fails.
    pub async fn serve_tls(self, addr: &str, cert_path: &str, key_path: &str) -> Result<(), Error> {
        let config = tls::load_server_config(cert_path, key_path)?;
        Server::bind(addr).tls(config).serve(self.mux).await
    }
}

/// Folds `middleware` around `endpoint` from the last element back to the
/// first, so `middleware[0]` ends up outermost.
pub fn compose(middleware: &[Arc<dyn Middleware>], endpoint: Endpoint) -> Endpoint {
    middleware
        .iter()
        .rev()
        .fold(endpoint, |next, m| m.apply(next))
}
