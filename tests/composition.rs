//! End-to-end composition scenarios driven without a socket.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use plait::middleware::{AccessLog, Middleware, Recover, Timer};
use plait::{
    BoxFuture, Composer, Endpoint, Handler, Method, Mux, Request, Response, Service, StatusCode,
};

type Log = Arc<Mutex<Vec<String>>>;

/// Records `<name>-start` / `<name>-end` around another middleware.
struct Tagged<M> {
    name: &'static str,
    inner: M,
    log: Log,
}

impl<M: Middleware> Middleware for Tagged<M> {
    fn apply(&self, next: Endpoint) -> Endpoint {
        Endpoint::new(TaggedService {
            name: self.name,
            wrapped: self.inner.apply(next),
            log: Arc::clone(&self.log),
        })
    }
}

struct TaggedService {
    name: &'static str,
    wrapped: Endpoint,
    log: Log,
}

impl Service for TaggedService {
    fn call(&self, req: Request) -> BoxFuture {
        self.log.lock().push(format!("{}-start", self.name));
        let fut = self.wrapped.call(req);
        let (log, name) = (Arc::clone(&self.log), self.name);
        Box::pin(async move {
            let res = fut.await;
            log.lock().push(format!("{name}-end"));
            res
        })
    }
}

fn tagged<M: Middleware>(name: &'static str, inner: M, log: &Log) -> Tagged<M> {
    Tagged { name, inner, log: Arc::clone(log) }
}

fn stack(log: &Log) -> Composer {
    let mut app = Composer::new();
    app.with(tagged("timer", Timer, log))
        .with(tagged("recover", Recover, log))
        .with(tagged("access-log", AccessLog, log));
    app
}

fn route(app: &Composer, path: &str) -> Endpoint {
    app.mux().lookup(Method::Get, path).map(|(ep, _)| ep).unwrap()
}

fn lines(log: &Log) -> Vec<String> {
    log.lock().clone()
}

async fn panics(_req: Request) -> Response {
    panic!("panic when access /panic")
}

#[tokio::test]
async fn normal_request_unwinds_through_every_layer() {
    let log = Log::default();
    let mut app = stack(&log);
    let hello_log = Arc::clone(&log);
    app.handle("/hello", move |_req: Request| {
        let log = Arc::clone(&hello_log);
        async move {
            log.lock().push("hello".to_owned());
            Response::text("Hello")
        }
    })
    .unwrap();

    let res = route(&app, "/hello").call(Request::new(Method::Get, "/hello")).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.body(), b"Hello");
    assert_eq!(
        lines(&log),
        [
            "timer-start",
            "recover-start",
            "access-log-start",
            "hello",
            "access-log-end",
            "recover-end",
            "timer-end",
        ]
    );
}

#[tokio::test]
async fn panicking_handler_is_recovered_and_timer_still_finishes() {
    let log = Log::default();
    let mut app = stack(&log);
    app.handle("/panic", panics).unwrap();

    let res = route(&app, "/panic").call(Request::new(Method::Get, "/panic")).await;

    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        lines(&log),
        ["timer-start", "recover-start", "access-log-start", "recover-end", "timer-end"]
    );
}

#[tokio::test]
async fn panic_without_recover_reaches_the_caller_unchanged() {
    let log = Log::default();
    let mut app = Composer::new();
    app.with(tagged("timer", Timer, &log));
    app.handle("/panic", panics).unwrap();

    let fut = route(&app, "/panic").call(Request::new(Method::Get, "/panic"));
    let payload = AssertUnwindSafe(fut).catch_unwind().await.unwrap_err();

    assert_eq!(payload.downcast_ref::<&str>(), Some(&"panic when access /panic"));
    assert_eq!(lines(&log), ["timer-start"]);
}

#[tokio::test]
async fn recover_does_not_protect_layers_outside_it() {
    let log = Log::default();
    // Replaces everything inside it with a panicking endpoint.
    let exploding = |_next: Endpoint| panics.into_endpoint();

    let mut app = Composer::new();
    app.with(tagged("outer", exploding, &log)).with(Recover);
    app.handle("/x", |_req: Request| async { "x" }).unwrap();

    let fut = route(&app, "/x").call(Request::new(Method::Get, "/x"));
    assert!(AssertUnwindSafe(fut).catch_unwind().await.is_err());
    assert_eq!(lines(&log), ["outer-start"]);
}

#[tokio::test]
async fn registered_routes_ignore_later_middleware() {
    let log = Log::default();
    let mut app = Composer::new();
    app.with(tagged("first", Timer, &log));
    app.handle("/before", |_req: Request| async { "before" }).unwrap();
    app.with(tagged("second", AccessLog, &log));

    route(&app, "/before").call(Request::new(Method::Get, "/before")).await;
    assert_eq!(lines(&log), ["first-start", "first-end"]);
}
