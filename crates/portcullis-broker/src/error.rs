//! Error types for the broker client.

/// Errors that can occur while managing the broker connection.
///
/// Connection failures after startup are not errors of this type: the
/// event loop logs them and stops on its own.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The broker configuration can't be used (empty host, port 0, ...).
    #[error("invalid broker configuration: {0}")]
    InvalidConfig(String),

    /// A request could not be handed to the event loop.
    #[error("broker client request failed: {0}")]
    Client(#[from] rumqttc::ClientError),
}
