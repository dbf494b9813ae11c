//! Per-request deadline.

use std::time::Duration;

use http::StatusCode;
use tracing::warn;

use crate::handler::{BoxFuture, Endpoint, Service};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;

/// Answers `408 Request Timeout` when the inner chain runs past the deadline.
///
/// The inner future is dropped on expiry, which cancels it at its next
/// `.await` point. Blocking code inside a handler is not interrupted.
#[derive(Clone, Copy, Debug)]
pub struct Timeout(pub Duration);

impl Middleware for Timeout {
    fn apply(&self, next: Endpoint) -> Endpoint {
        Endpoint::new(TimeoutService { next, limit: self.0 })
    }
}

struct TimeoutService {
    next: Endpoint,
    limit: Duration,
}

impl Service for TimeoutService {
    fn call(&self, req: Request) -> BoxFuture {
        let path = req.path().to_owned();
        let limit = self.limit;
        let fut = self.next.call(req);

        Box::pin(async move {
            match tokio::time::timeout(limit, fut).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(path = %path, limit_ms = millis(limit), "request timed out");
                    Response::status(StatusCode::REQUEST_TIMEOUT)
                }
            }
        })
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
