//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use http::StatusCode;
use tracing::error;

use crate::handler::{BoxFuture, Endpoint, Service};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;

/// Converts a panic anywhere inside this layer into `500 Internal Server Error`.
///
/// Only layers appended *after* `Recover` (and the handler) are protected.
/// Append it first, or right after anything that must observe every request
/// such as [`Timer`](super::Timer).
#[derive(Clone, Copy, Debug, Default)]
pub struct Recover;

impl Middleware for Recover {
    fn apply(&self, next: Endpoint) -> Endpoint {
        Endpoint::new(RecoverService { next })
    }
}

struct RecoverService {
    next: Endpoint,
}

impl Service for RecoverService {
    fn call(&self, req: Request) -> BoxFuture {
        let path = req.path().to_owned();

        // Building the inner future can panic too, not just polling it.
        let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| self.next.call(req))) {
            Ok(fut) => fut,
            Err(payload) => {
                report(&path, payload.as_ref());
                return Box::pin(async { internal_error() });
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => {
                    report(&path, payload.as_ref());
                    internal_error()
                }
            }
        })
    }
}

fn report(path: &str, payload: &(dyn Any + Send)) {
    error!(path, panic = panic_message(payload), "handler panicked");
}

fn internal_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .text("Internal Server Error")
}

/// Best-effort text of a panic payload. `panic!` produces `&str` or `String`.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::method::Method;

    async fn boom(_req: Request) -> Response {
        panic!("boom")
    }

    async fn fine(_req: Request) -> Response {
        Response::text("fine")
    }

    #[tokio::test]
    async fn turns_panic_into_500() {
        let ep = Recover.apply(boom.into_endpoint());
        let res = ep.call(Request::new(Method::Get, "/panic")).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"Internal Server Error");
    }

    #[tokio::test]
    async fn catches_panic_while_building_the_future() {
        let eager = |_next: Endpoint| -> Endpoint {
            struct Eager;
            impl Service for Eager {
                fn call(&self, _req: Request) -> BoxFuture {
                    panic!("eager")
                }
            }
            Endpoint::new(Eager)
        };
        let ep = Recover.apply(eager.apply(fine.into_endpoint()));
        let res = ep.call(Request::new(Method::Get, "/")).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn passes_normal_responses_through() {
        let ep = Recover.apply(fine.into_endpoint());
        let res = ep.call(Request::new(Method::Get, "/")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"fine");
    }

    #[test]
    fn reads_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "<non-string panic payload>");
    }
}
