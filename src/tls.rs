//! TLS server configuration from PEM files.
//!
//! Used by [`Composer::serve_tls`](crate::Composer::serve_tls) and available
//! directly for [`Server::tls`](crate::Server::tls).

use std::io::BufReader;
use std::sync::Arc;

use rustls::ServerConfig;

use crate::error::Error;

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate chain and
/// private key bytes. ALPN advertises HTTP/2 and HTTP/1.1.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, or if rustls
/// rejects the pair.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>, Error> {
    build(cert_pem, key_pem, "<memory>")
}

/// Read a PEM certificate chain and private key from disk and build a
/// [`rustls::ServerConfig`].
///
/// # Errors
///
/// Returns an error if either file cannot be read or parsed.
pub fn load_server_config(cert_path: &str, key_path: &str) -> Result<Arc<ServerConfig>, Error> {
    let cert_pem = std::fs::read(cert_path)?;
    let key_pem = std::fs::read(key_path)?;
    build(&cert_pem, &key_pem, key_path)
}

fn build(cert_pem: &[u8], key_pem: &[u8], key_source: &str) -> Result<Arc<ServerConfig>, Error> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(Error::Tls(rustls::Error::NoCertificatesPresented));
    }

    let key = rustls_pemfile::private_key(&mut BufReader::new(key_pem))?
        .ok_or_else(|| Error::NoPrivateKey(key_source.to_owned()))?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_pem() {
        let err = build_server_config(b"", b"").unwrap_err();
        assert!(matches!(err, Error::Tls(_)));
    }

    #[test]
    fn rejects_garbage_pem() {
        assert!(build_server_config(b"not a pem", b"also not a pem").is_err());
    }

    #[test]
    fn missing_files_are_io_errors() {
        let err = load_server_config("/nonexistent/cert.pem", "/nonexistent/key.pem").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    const CERT: &[u8] = include_bytes!("../tests/fixtures/cert.pem");
    const KEY: &[u8] = include_bytes!("../tests/fixtures/key.pem");

    #[test]
    fn builds_from_matching_pair() {
        let config = build_server_config(CERT, KEY).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }

    #[test]
    fn loads_pair_from_disk() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
        let config = load_server_config(&format!("{dir}/cert.pem"), &format!("{dir}/key.pem")).unwrap();
        assert_eq!(config.alpn_protocols.len(), 2);
    }

    #[test]
    fn cert_without_key_is_reported() {
        let err = build_server_config(CERT, CERT).unwrap_err();
        assert!(matches!(err, Error::NoPrivateKey(_)));
    }
}
