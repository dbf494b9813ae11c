//! Process-wide default composer.
//!
//! A convenience for small programs that would rather not thread a
//! [`Composer`] through their setup code:
//!
//! ```rust,no_run
//! use plait::{global, Request, Response};
//! use plait::middleware::{Recover, Timer};
//!
//! # async fn run() -> Result<(), plait::Error> {
//! global::add(Timer);
//! global::add(Recover);
//! global::handle("/hello", hello)?;
//! global::serve("0.0.0.0:3000").await
//! # }
//! async fn hello(_req: Request) -> Response { Response::text("Hello") }
//! ```
//!
//! The same ordering and snapshot rules as [`Composer`] apply. All mutation
//! belongs to a single setup phase before [`serve`]; registering from other
//! threads while serving is the caller's responsibility. The lock exists so
//! the static is sound, not to make concurrent setup meaningful.

use std::sync::LazyLock;

use parking_lot::Mutex;

use crate::composer::Composer;
use crate::error::Error;
use crate::handler::{Handler, Service};
use crate::middleware::Middleware;
use crate::router::Router;

static DEFAULT: LazyLock<Mutex<Composer<Router>>> = LazyLock::new(|| Mutex::new(Composer::new()));

/// Appends middleware to the default composer.
pub fn add(middleware: impl Middleware) {
    DEFAULT.lock().with(middleware);
}

/// Registers `handler` on the default composer for every method.
///
/// # Errors
///
/// Returns whatever the default router reports.
pub fn handle(pattern: &str, handler: impl Handler) -> Result<(), Error> {
    DEFAULT.lock().handle(pattern, handler).map(|_| ())
}

/// Registers a router-level service on the default composer.
///
/// # Errors
///
/// Returns whatever the default router reports.
pub fn handle_service(pattern: &str, service: impl Service) -> Result<(), Error> {
    DEFAULT.lock().handle_service(pattern, service).map(|_| ())
}

/// Takes the default composer, leaving a fresh one in its place.
pub fn take() -> Composer<Router> {
    std::mem::take(&mut *DEFAULT.lock())
}

/// Serves everything registered on the default composer.
///
/// # Errors
///
/// Propagates bind failures from the server unchanged.
pub async fn serve(addr: &str) -> Result<(), Error> {
    take().serve(addr).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::request::Request;
    use crate::response::Response;
    use crate::router::Mux;
    use crate::Endpoint;

    async fn hello(_req: Request) -> Response {
        Response::text("Hello")
    }

    // The only test touching the static, so no other test can race it.
    #[tokio::test]
    async fn registers_through_the_default_instance() {
        add(|next: Endpoint| next);
        handle("/global-hello", hello).unwrap();
        assert!(handle("/global-hello", hello).is_err());

        let app = take();
        assert_eq!(app.middleware().len(), 1);
        let (ep, _) = app.mux().lookup(Method::Get, "/global-hello").unwrap();
        assert_eq!(ep.call(Request::new(Method::Get, "/global-hello")).await.body(), b"Hello");

        assert!(take().middleware().is_empty());
    }
}
