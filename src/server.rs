//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown
//!
//! The trigger is SIGTERM or Ctrl-C, or the future passed to
//! [`Server::with_graceful_shutdown`]. When it fires the server:
//! 1. Stops calling `listener.accept()`, so no new connections are made.
//! 2. Tells every open connection to shut down gracefully. Requests already
//!    being served run to completion; idle keep-alive connections close.
//! 3. Returns from [`Server::serve`] once every connection task has ended.
//!
//! # Fault boundary
//!
//! Each connection runs in its own task. A panic that no
//! [`Recover`](crate::middleware::Recover) layer catches ends that task only
//! and the server keeps accepting. For HTTP/1.1 the panic is logged when the
//! task is reaped. HTTP/2 streams run on tasks of their own, spawned by hyper,
//! so a panic there drops the stream and is reported only by the default
//! panic hook.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::method::Method;
use crate::middleware::recover::panic_message;
use crate::request::Request;
use crate::response::Response;
use crate::router::Mux;

type Shutdown = Pin<Box<dyn Future<Output = ()> + Send>>;

enum Bind {
    Addr(String),
    Listener(TcpListener),
}

/// The HTTP server.
///
/// ```rust,no_run
/// use plait::{Router, Server};
///
/// # async fn run() -> Result<(), plait::Error> {
/// Server::bind("0.0.0.0:3000").serve(Router::new()).await
/// # }
/// ```
pub struct Server {
    bind: Bind,
    tls: Option<TlsAcceptor>,
    shutdown: Option<Shutdown>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. Anything `tokio::net::TcpListener::bind` accepts works,
    /// including `localhost:3000`.
    pub fn bind(addr: &str) -> Self {
        Self::with_bind(Bind::Addr(addr.to_owned()))
    }

    /// Serves on an already-bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self::with_bind(Bind::Listener(listener))
    }

    fn with_bind(bind: Bind) -> Self {
        Self { bind, tls: None, shutdown: None }
    }

    /// Terminates TLS on every accepted connection.
    pub fn tls(mut self, config: Arc<rustls::ServerConfig>) -> Self {
        self.tls = Some(TlsAcceptor::from(config));
        self
    }

    /// Replaces the default SIGTERM / Ctrl-C trigger with `signal`.
    pub fn with_graceful_shutdown(mut self, signal: impl Future<Output = ()> + Send + 'static) -> Self {
        self.shutdown = Some(Box::pin(signal));
        self
    }

    /// Starts accepting connections and dispatching them through `mux`.
    ///
    /// Returns only after a full graceful shutdown: the signal fires, open
    /// connections finish their in-flight requests and close, and every
    /// connection task ends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the address cannot be bound.
    pub async fn serve<M: Mux>(self, mux: M) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr.as_str()).await?,
            Bind::Listener(listener) => listener,
        };
        let local = listener.local_addr()?;

        // Shared across connection tasks without copying the routing table.
        let mux = Arc::new(mux);
        let tls = self.tls;

        info!(addr = %local, tls = tls.is_some(), "plait listening");

        let mut tasks = tokio::task::JoinSet::new();
        let (stop_tx, stop_rx) = watch::channel(());

        let shutdown: Shutdown = match self.shutdown {
            Some(signal) => signal,
            None => Box::pin(shutdown_signal()),
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting immediately,
                // even if more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    let _ = stop_tx.send(());
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let mux = Arc::clone(&mux);
                    let tls = tls.clone();
                    let stop = stop_rx.clone();

                    tasks.spawn(async move {
                        match tls {
                            Some(acceptor) => match acceptor.accept(stream).await {
                                Ok(stream) => serve_connection(stream, mux, remote_addr, stop).await,
                                Err(e) => warn!(peer = %remote_addr, "tls handshake failed: {e}"),
                            },
                            None => serve_connection(stream, mux, remote_addr, stop).await,
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => report_join(joined),
            }
        }

        while let Some(joined) = tasks.join_next().await {
            report_join(joined);
        }

        info!("plait stopped");
        Ok(())
    }
}

fn report_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            let payload = e.into_panic();
            error!(panic = panic_message(payload.as_ref()), "connection task panicked");
        } else {
            debug!("connection task cancelled: {e}");
        }
    }
}

async fn serve_connection<I, M>(io: I, mux: Arc<M>, remote_addr: SocketAddr, mut stop: watch::Receiver<()>)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    M: Mux,
{
    // Called once per request on the connection, not once per connection.
    let svc = service_fn(move |req| {
        let mux = Arc::clone(&mux);
        async move { dispatch(mux.as_ref(), req, remote_addr).await }
    });

    // `auto::Builder` handles both HTTP/1.1 and HTTP/2, whatever the client
    // negotiates.
    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(io), svc);
    tokio::pin!(conn);

    // A closed channel means the server is gone; shut down either way.
    let res = tokio::select! {
        res = conn.as_mut() => res,
        _ = stop.changed() => {
            debug!(peer = %remote_addr, "closing connection for shutdown");
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = res {
        error!(peer = %remote_addr, "connection error: {e}");
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response.
///
/// The error type is [`Infallible`](std::convert::Infallible): unknown
/// methods become 405, unmatched paths 404, unreadable bodies 400.
async fn dispatch<M: Mux>(
    mux: &M,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let Ok(method) = Method::try_from(req.method()) else {
        return Ok(Response::status(StatusCode::METHOD_NOT_ALLOWED).into_inner());
    };

    let Some((endpoint, params)) = mux.lookup(method, req.uri().path()) else {
        return Ok(Response::status(StatusCode::NOT_FOUND).into_inner());
    };

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let mut request = Request::from_parts(parts, method, body, remote_addr);
    request.set_params(params);

    Ok(endpoint.call(request).await.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. If a handler cannot be installed the
/// corresponding arm never fires rather than bringing the server down.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
