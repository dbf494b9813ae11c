//! Demo service: the three classic endpoints behind a full middleware stack.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example hello
//!
//! Try:
//!   curl http://localhost:3000/hello
//!   curl http://localhost:3000/world
//!   curl -i http://localhost:3000/panic     # 500, server keeps running
//!
//! Configure with `PLAIT_LISTEN_ADDR`, `PLAIT_TLS_CERT_PATH`,
//! `PLAIT_TLS_KEY_PATH`, `PLAIT_LOG_LEVEL`, `PLAIT_REQUEST_TIMEOUT_SECS`.

use plait::middleware::{self, AccessLog, Recover, Timeout, Timer};
use plait::{Composer, Config, Endpoint, Request, Response};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), plait::Error> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut app = Composer::new();
    app.with(Timer)
        .with(Recover)
        .with(AccessLog)
        .with(Timeout(config.request_timeout()))
        .with(middleware::from_fn(log_one))
        .with(middleware::from_fn(log_two));

    app.handle("/panic", explode)?
        .handle("/hello", hello)?
        .handle("/world", world)?;

    match config.tls_paths() {
        Some((cert, key)) => app.serve_tls(&config.listen_addr, cert, key).await,
        None => app.serve(&config.listen_addr).await,
    }
}

async fn hello(_req: Request) -> Response {
    info!("Hello");
    Response::text("Hello")
}

async fn world(_req: Request) -> Response {
    info!("World");
    Response::text("World")
}

async fn explode(_req: Request) -> Response {
    panic!("panic when accessing /panic")
}

async fn log_one(req: Request, next: Endpoint) -> Response {
    info!("log middleware 1 in");
    let res = next.call(req).await;
    info!("log middleware 1 out");
    res
}

async fn log_two(req: Request, next: Endpoint) -> Response {
    info!("log middleware 2 in");
    let res = next.call(req).await;
    info!("log middleware 2 out");
    res
}
