//! Request latency logging.

use std::time::Instant;

use tracing::info;

use crate::handler::{BoxFuture, Endpoint, Service};
use crate::middleware::Middleware;
use crate::request::Request;

/// Logs how long the wrapped chain took, in milliseconds.
///
/// The measurement covers every layer appended after `Timer`. A panic that
/// escapes the inner chain skips the log line; put [`Recover`](super::Recover)
/// inside `Timer` to time failed requests as well.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timer;

impl Middleware for Timer {
    fn apply(&self, next: Endpoint) -> Endpoint {
        Endpoint::new(TimerService { next })
    }
}

struct TimerService {
    next: Endpoint,
}

impl Service for TimerService {
    fn call(&self, req: Request) -> BoxFuture {
        let method = req.method();
        let path = req.path().to_owned();
        let started = Instant::now();
        let fut = self.next.call(req);

        Box::pin(async move {
            let res = fut.await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            info!(%method, path = %path, elapsed_ms, "request timed");
            res
        })
    }
}
