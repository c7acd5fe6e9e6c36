//! Transport abstraction layer for Portcullis.
//!
//! Provides the [`Transport`] trait for accepting byte-stream connections,
//! with a plain TCP implementation ([`TcpTransport`]) and a TLS one
//! ([`TlsTransport`]). The HTTP layer above only ever sees an
//! [`Incoming`] connection whose handshake it completes on the
//! connection's own task, so a slow TLS client never stalls the accept
//! loop.
//!
//! # Feature Flags
//!
//! - `tls` (default): TLS listener via `tokio-rustls`

mod error;
mod tcp;
#[cfg(feature = "tls")]
mod tls;

pub use error::TransportError;
pub use tcp::TcpTransport;
#[cfg(feature = "tls")]
pub use tls::{server_config, TlsTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide connection ID.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Any bidirectional byte stream the HTTP layer can drive.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// A type-erased stream, so plain and TLS connections look the same.
pub type BoxedStream = Box<dyn AsyncStream>;

type Handshake = Pin<Box<dyn Future<Output = Result<BoxedStream, TransportError>> + Send>>;

/// A connection that has been accepted but not yet established.
pub struct Incoming {
    id: ConnectionId,
    peer: SocketAddr,
    handshake: Handshake,
}

impl Incoming {
    pub(crate) fn new(peer: SocketAddr, handshake: Handshake) -> Self {
        Self {
            id: ConnectionId::next(),
            peer,
            handshake,
        }
    }

    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The remote peer's address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Completes the transport handshake (a no-op for plain TCP).
    pub async fn establish(self) -> Result<BoxedStream, TransportError> {
        self.handshake.await
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// Waits for and accepts the next incoming connection.
    fn accept(&mut self) -> impl Future<Output = Result<Incoming, TransportError>> + Send;

    /// The address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}

/// Either kind of listener, chosen at startup.
pub enum Listener {
    Tcp(TcpTransport),
    #[cfg(feature = "tls")]
    Tls(TlsTransport),
}

impl Transport for Listener {
    async fn accept(&mut self) -> Result<Incoming, TransportError> {
        match self {
            Self::Tcp(t) => t.accept().await,
            #[cfg(feature = "tls")]
            Self::Tls(t) => t.accept().await,
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        match self {
            Self::Tcp(t) => t.local_addr(),
            #[cfg(feature = "tls")]
            Self::Tls(t) => t.local_addr(),
        }
    }
}

impl From<TcpTransport> for Listener {
    fn from(t: TcpTransport) -> Self {
        Self::Tcp(t)
    }
}

#[cfg(feature = "tls")]
impl From<TlsTransport> for Listener {
    fn from(t: TlsTransport) -> Self {
        Self::Tls(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }
}
