//! # Portcullis
//!
//! Session-gated access control in front of a static web application.
//!
//! Every HTTP request passes a [`LoginGate`]: public assets go straight
//! through, the login form creates a session on a credential match, and
//! everything else needs a cookie naming a live session. A sweeper task
//! removes sessions that sit idle longer than the TTL, and an optional
//! broker client keeps a messaging connection open beside the server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portcullis::prelude::*;
//!
//! # async fn run() -> Result<(), PortcullisError> {
//! let server = PortcullisServer::builder()
//!     .bind("127.0.0.1:8080")
//!     .document_root("./www")
//!     .build()
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod config;
mod error;
pub mod gate;
mod handler;
mod router;
mod server;

pub use config::{GateConfig, StaticConfig};
pub use error::PortcullisError;
pub use gate::{GateDecision, LoginGate, Route};
pub use router::router;
pub use server::{PortcullisServer, PortcullisServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{
        GateConfig, GateDecision, LoginGate, PortcullisError, PortcullisServer,
        PortcullisServerBuilder, Route, StaticConfig,
    };
    pub use portcullis_broker::BrokerConfig;
    pub use portcullis_session::{
        Authenticator, Credential, CredentialTable, SessionConfig, SessionError, SessionStore,
        SessionToken, SharedStore,
    };
    pub use portcullis_sweep::SweepConfig;
}
