//! Unified error type.

use thiserror::Error;

/// The error type returned by plait's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// setup and infrastructure failures: registering a route the router rejects,
/// reading configuration, loading certificates, binding to a port.
#[derive(Debug, Error)]
pub enum Error {
    /// Binding, accepting or reading from the filesystem failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The router refused a pattern (malformed, or already registered).
    #[error("invalid route `{pattern}`: {source}")]
    Route {
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },

    /// A method string that is not one of the known [`Method`](crate::Method)s.
    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    #[error("tls: {0}")]
    Tls(#[from] rustls::Error),

    #[error("no private key found in `{0}`")]
    NoPrivateKey(String),

    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
