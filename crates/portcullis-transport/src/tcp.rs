//! Plain TCP transport.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::{BoxedStream, Incoming, Transport, TransportError};

/// A [`Transport`] that hands out raw TCP streams.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }

    /// Waits for the next raw TCP connection.
    pub(crate) async fn accept_tcp(
        &self,
    ) -> Result<(tokio::net::TcpStream, SocketAddr), TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        // Responses are small; don't let Nagle hold them back.
        let _ = stream.set_nodelay(true);
        Ok((stream, peer))
    }
}

impl Transport for TcpTransport {
    async fn accept(&mut self) -> Result<Incoming, TransportError> {
        let (stream, peer) = self.accept_tcp().await?;
        let incoming = Incoming::new(
            peer,
            Box::pin(async move { Ok(Box::new(stream) as BoxedStream) }),
        );
        tracing::debug!(id = %incoming.id(), %peer, "accepted TCP connection");
        Ok(incoming)
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::LocalAddr)
    }
}
