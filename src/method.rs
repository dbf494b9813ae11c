//! HTTP method as a typed enum.
//!
//! Covers the RFC 9110 standard methods and `PURGE` used by nginx and Varnish
//! for cache invalidation. Unknown method strings are rejected by the server
//! with `405 Method Not Allowed` before they ever reach a router.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
    Purge,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Purge   => "PURGE",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PURGE"   => Ok(Self::Purge),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            other     => Err(Error::UnknownMethod(other.to_owned())),
        }
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = Error;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        m.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_sensitively() {
        assert_eq!("GET".parse::<Method>().ok(), Some(Method::Get));
        assert!("get".parse::<Method>().is_err());
    }

    #[test]
    fn rejects_webdav_methods() {
        let err = "PROPFIND".parse::<Method>().unwrap_err();
        assert!(matches!(err, Error::UnknownMethod(m) if m == "PROPFIND"));
    }

    #[test]
    fn converts_from_http_method() {
        assert_eq!(Method::try_from(&http::Method::DELETE).ok(), Some(Method::Delete));
    }
}
