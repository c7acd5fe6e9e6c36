//! Unified error type for Portcullis.

use portcullis_broker::BrokerError;
use portcullis_session::SessionError;
use portcullis_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PortcullisError {
    /// Binding, TLS setup, or accepting a connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A session-level error (credentials, capacity).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The broker client could not be started or stopped.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// HTTP/1.1 protocol error on a single connection.
    #[error("http connection error: {0}")]
    Http(#[from] hyper::Error),
}
