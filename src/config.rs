//! Service configuration from the environment.
//!
//! The composer itself reads no configuration. Binaries built on it load a
//! [`Config`] at startup and pass the values to [`Composer::serve`],
//! [`Composer::serve_tls`] and [`Timeout`](crate::middleware::Timeout).
//!
//! | Variable | Default |
//! |---|---|
//! | `PLAIT_LISTEN_ADDR` | `0.0.0.0:3000` |
//! | `PLAIT_TLS_CERT_PATH` | unset (plain HTTP) |
//! | `PLAIT_TLS_KEY_PATH` | unset (plain HTTP) |
//! | `PLAIT_LOG_LEVEL` | `info` |
//! | `PLAIT_REQUEST_TIMEOUT_SECS` | `30` |
//!
//! [`Composer::serve`]: crate::Composer::serve
//! [`Composer::serve_tls`]: crate::Composer::serve_tls

use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// PEM certificate chain. Must be set together with `tls_key_path`.
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// PEM private key. Must be set together with `tls_cert_path`.
    #[serde(default)]
    pub tls_key_path: Option<String>,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            tls_cert_path: None,
            tls_key_path: None,
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load and validate configuration from `PLAIT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the combination is
    /// invalid.
    pub fn from_env() -> Result<Self, Error> {
        let cfg = ::config::Config::builder()
            .add_source(::config::Environment::with_prefix("PLAIT"))
            .build()?;

        let c: Config = cfg.try_deserialize()?;
        c.validate()?;
        Ok(c)
    }

    /// Certificate and key paths, when TLS is configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
            _ => None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.listen_addr.trim().is_empty() {
            return Err(Error::InvalidConfig("PLAIT_LISTEN_ADDR must not be empty".into()));
        }
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            return Err(Error::InvalidConfig(
                "PLAIT_TLS_CERT_PATH and PLAIT_TLS_KEY_PATH must be set together".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidConfig("PLAIT_REQUEST_TIMEOUT_SECS must be > 0".into()));
        }
        Ok(())
    }
}
