//! Radix-tree request router and the [`Mux`] capability.
//!
//! The composer does not care how patterns are matched. It hands finished
//! endpoints to anything that implements [`Mux`]; [`Router`] is the default.

use std::collections::HashMap;

use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::Endpoint;
use crate::method::Method;
use crate::request::Params;

/// A routing table endpoints can be registered in and dispatched from.
///
/// Registration happens during setup, through `&mut self`. Dispatch happens
/// concurrently while serving, through `&self`.
pub trait Mux: Send + Sync + 'static {
    /// Binds `pattern` to `endpoint`. `None` binds every method.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is malformed or already bound.
    fn register(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        endpoint: Endpoint,
    ) -> Result<(), Error>;

    /// Finds the endpoint for a request, with any captured path parameters.
    fn lookup(&self, method: Method, path: &str) -> Option<(Endpoint, Params)>;
}

/// The default router.
///
/// One radix tree per HTTP method plus one for method-agnostic patterns.
/// O(path-length) lookup. A method-specific route wins over a method-agnostic
/// one for the same path.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Endpoint>>,
    any: MatchitRouter<Endpoint>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Mux for Router {
    fn register(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        endpoint: Endpoint,
    ) -> Result<(), Error> {
        let tree = match method {
            Some(m) => self.routes.entry(m).or_default(),
            None => &mut self.any,
        };
        tree.insert(pattern, endpoint).map_err(|source| Error::Route {
            pattern: pattern.to_owned(),
            source,
        })
    }

    fn lookup(&self, method: Method, path: &str) -> Option<(Endpoint, Params)> {
        let matched = self
            .routes
            .get(&method)
            .and_then(|tree| tree.at(path).ok())
            .or_else(|| self.any.at(path).ok())?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value.clone(), params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::request::Request;
    use crate::response::Response;

    async fn named(req: Request) -> Response {
        Response::text(req.path().to_owned())
    }

    async fn specific(_req: Request) -> Response {
        Response::text("specific")
    }

    #[test]
    fn rejects_duplicate_pattern() {
        let mut router = Router::new();
        router.register(None, "/a", named.into_endpoint()).unwrap();
        let err = router.register(None, "/a", named.into_endpoint()).unwrap_err();
        assert!(matches!(err, Error::Route { ref pattern, .. } if pattern == "/a"));
    }

    #[test]
    fn captures_params() {
        let mut router = Router::new();
        router.register(Some(Method::Get), "/users/{id}", named.into_endpoint()).unwrap();
        let (_, params) = router.lookup(Method::Get, "/users/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert!(router.lookup(Method::Post, "/users/42").is_none());
    }

    #[tokio::test]
    async fn method_route_wins_over_any() {
        let mut router = Router::new();
        router.register(None, "/x", named.into_endpoint()).unwrap();
        router.register(Some(Method::Get), "/x", specific.into_endpoint()).unwrap();

        let (ep, _) = router.lookup(Method::Get, "/x").unwrap();
        assert_eq!(ep.call(Request::new(Method::Get, "/x")).await.body(), b"specific");

        let (ep, _) = router.lookup(Method::Put, "/x").unwrap();
        assert_eq!(ep.call(Request::new(Method::Put, "/x")).await.body(), b"/x");
    }
}
