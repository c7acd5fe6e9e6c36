//! Messaging-broker connection for Portcullis.
//!
//! Only the connection lifecycle lives here: connect with a clean-session
//! MQTT handshake, log what the broker sends, disconnect on shutdown.
//! Nothing is published or subscribed.
//!
//! ```text
//! BrokerClient::connect ──→ CONNECT (clean session) ──→ CONNACK (logged)
//!         │                                                  │
//!         ▼                                                  ▼
//!   disconnect() ──→ DISCONNECT            first error ──→ logged, loop ends
//! ```

mod client;
mod config;
mod error;

pub use client::BrokerClient;
pub use config::BrokerConfig;
pub use error::BrokerError;
