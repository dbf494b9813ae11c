//! # plait
//!
//! Ordered middleware composition for HTTP services.
//!
//! ## The contract
//!
//! You append middleware to a [`Composer`]. You register handlers on it.
//! Each registration wraps the handler in the middleware appended *so far*,
//! first-appended outermost, and hands the result to a router. That is the
//! whole idea.
//!
//! - **Order** is append order. `with(Timer).with(Recover)` means `Timer`
//!   sees every request first and every response last.
//! - **Snapshots**: composition happens once, at registration. Appending
//!   later never changes a route that is already registered.
//! - **Short-circuit**: a middleware that never calls `next` stops the
//!   request there. Nothing inside it runs.
//! - **No magic**: the composer does not log, retry or catch panics. Those
//!   are ordinary middleware ([`middleware::Recover`], [`middleware::Timer`],
//!   [`middleware::AccessLog`], [`middleware::Timeout`]) and their position
//!   decides what they cover.
//!
//! Routing ([`matchit`]), the wire protocol (hyper, HTTP/1.1 and HTTP/2) and
//! TLS (rustls) are delegated.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use plait::{Composer, Request, Response};
//! use plait::middleware::{AccessLog, Recover, Timer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), plait::Error> {
//!     let mut app = Composer::new();
//!     app.with(Timer).with(Recover).with(AccessLog);
//!     app.handle("/hello", hello)?
//!        .handle("/panic", panics)?;
//!
//!     app.serve("0.0.0.0:3000").await
//! }
//!
//! async fn hello(_req: Request) -> Response {
//!     Response::text("Hello")
//! }
//!
//! // Recover turns this into a 500; Timer still logs the latency.
//! async fn panics(_req: Request) -> Response {
//!     panic!("panic when accessing /panic")
//! }
//! ```

mod composer;
mod config;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod global;
pub mod middleware;
pub mod tls;

pub use composer::{Composer, compose};
pub use self::config::Config;
pub use error::Error;
pub use handler::{BoxFuture, Endpoint, Handler, Service};
pub use http::StatusCode;
pub use method::Method;
pub use request::{Params, Request};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::{Mux, Router};
pub use server::Server;
