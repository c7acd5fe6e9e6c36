/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Loading the TLS certificate or key failed.
    #[error("TLS configuration error: {0}")]
    TlsConfig(#[source] std::io::Error),

    /// The TLS handshake with a client failed.
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),

    /// Reading the local address of the listener failed.
    #[error("listener address unavailable: {0}")]
    LocalAddr(#[source] std::io::Error),
}
