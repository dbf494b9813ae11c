//! Structured access log.

use tracing::{debug, info};

use crate::handler::{BoxFuture, Endpoint, Service};
use crate::middleware::Middleware;
use crate::request::Request;

/// Logs peer address, method and URI on the way in, status on the way out.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessLog;

impl Middleware for AccessLog {
    fn apply(&self, next: Endpoint) -> Endpoint {
        Endpoint::new(AccessLogService { next })
    }
}

struct AccessLogService {
    next: Endpoint,
}

impl Service for AccessLogService {
    fn call(&self, req: Request) -> BoxFuture {
        let method = req.method();
        let uri = req.uri();
        let peer = req
            .remote_addr()
            .map_or_else(|| "-".to_owned(), |a| a.to_string());

        info!(%peer, %method, %uri, "request");
        let fut = self.next.call(req);

        Box::pin(async move {
            let res = fut.await;
            debug!(%peer, %method, %uri, status = res.status_code().as_u16(), "response");
            res
        })
    }
}
