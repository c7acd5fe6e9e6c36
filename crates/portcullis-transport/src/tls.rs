//! TLS transport using `tokio-rustls`.

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::{BoxedStream, Incoming, TcpTransport, Transport, TransportError};

/// ALPN identifiers offered to clients. Only HTTP/1.1 is served.
fn alpn_protocols() -> Vec<Vec<u8>> {
    vec![b"http/1.1".to_vec()]
}

async fn read_key(key_path: &Path) -> Result<PrivateKeyDer<'static>, io::Error> {
    let key = tokio::fs::read(key_path).await?;

    if matches!(key_path.extension(), Some(x) if x == "der") {
        Ok(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key)))
    } else {
        rustls_pemfile::private_key(&mut &*key)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no keys found in key file"))
    }
}

async fn read_cert(cert_path: &Path) -> Result<Vec<CertificateDer<'static>>, io::Error> {
    let cert = tokio::fs::read(cert_path).await?;

    if matches!(cert_path.extension(), Some(x) if x == "der") {
        return Ok(vec![CertificateDer::from(cert)]);
    }

    let certs = rustls_pemfile::certs(&mut &*cert).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "no certificates found in certificate file",
        ));
    }
    Ok(certs)
}

/// Builds a rustls server config from a certificate chain and private key.
///
/// Files ending in `.der` are read as raw DER (PKCS#8 for the key);
/// anything else is parsed as PEM.
pub async fn server_config(cert_path: &Path, key_path: &Path) -> Result<ServerConfig, TransportError> {
    let (key, certs) = tokio::try_join!(read_key(key_path), read_cert(cert_path))
        .map_err(TransportError::TlsConfig)?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| {
            TransportError::TlsConfig(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to build server config: {e}"),
            ))
        })?;

    config.alpn_protocols = alpn_protocols();

    Ok(config)
}

/// A [`Transport`] that terminates TLS on every accepted connection.
pub struct TlsTransport {
    tcp: TcpTransport,
    acceptor: TlsAcceptor,
}

impl TlsTransport {
    /// Binds to `addr` and serves TLS with the given certificate and key.
    pub async fn bind(addr: &str, cert_path: &Path, key_path: &Path) -> Result<Self, TransportError> {
        let config = server_config(cert_path, key_path).await?;
        let tcp = TcpTransport::bind(addr).await?;
        tracing::info!(cert = %cert_path.display(), "TLS enabled");
        Ok(Self::with_config(tcp, config))
    }

    /// Wraps an already-bound TCP transport with a prepared config.
    pub fn with_config(tcp: TcpTransport, config: ServerConfig) -> Self {
        Self {
            tcp,
            acceptor: TlsAcceptor::from(Arc::new(config)),
        }
    }
}

impl Transport for TlsTransport {
    async fn accept(&mut self) -> Result<Incoming, TransportError> {
        let (stream, peer) = self.tcp.accept_tcp().await?;
        let acceptor = self.acceptor.clone();
        let incoming = Incoming::new(
            peer,
            Box::pin(async move {
                let tls = acceptor
                    .accept(stream)
                    .await
                    .map_err(TransportError::Handshake)?;
                Ok(Box::new(tls) as BoxedStream)
            }),
        );
        tracing::debug!(id = %incoming.id(), %peer, "accepted TLS connection");
        Ok(incoming)
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.tcp.local_addr()
    }
}
