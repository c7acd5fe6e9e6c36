//! `PortcullisServer` builder and server loop.
//!
//! This is the entry point for running Portcullis. It ties together all
//! the layers: transport → HTTP → gate → session store, with the sweeper
//! and the broker client running beside them.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use portcullis_broker::{BrokerClient, BrokerConfig};
use portcullis_session::{CredentialTable, SessionConfig, SessionStore, SharedStore};
use portcullis_sweep::{SweepConfig, Sweeper};
use portcullis_transport::{Listener, TcpTransport, Transport};

use crate::gate::LoginGate;
use crate::handler::handle_connection;
use crate::router::router;
use crate::{GateConfig, PortcullisError, StaticConfig};

/// Builder for configuring and starting a Portcullis server.
///
/// # Example
///
/// ```rust,no_run
/// use portcullis::prelude::*;
///
/// # async fn run() -> Result<(), PortcullisError> {
/// let server = PortcullisServer::builder()
///     .bind("0.0.0.0:8443")
///     .tls("server.pem", "server.key")
///     .document_root("./www")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PortcullisServerBuilder {
    bind_addr: String,
    tls: Option<(PathBuf, PathBuf)>,
    session_config: SessionConfig,
    sweep_config: SweepConfig,
    gate_config: GateConfig,
    static_config: StaticConfig,
    credentials: CredentialTable,
    broker: Option<BrokerConfig>,
}

impl PortcullisServerBuilder {
    /// Creates a new builder with default settings: plain TCP on
    /// `127.0.0.1:8443`, default credentials, no broker.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8443".to_string(),
            tls: None,
            session_config: SessionConfig::default(),
            sweep_config: SweepConfig::default(),
            gate_config: GateConfig::default(),
            static_config: StaticConfig::default(),
            credentials: CredentialTable::default(),
            broker: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Serves over TLS using the given certificate chain and private key
    /// (PEM or DER).
    pub fn tls(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.tls = Some((cert.into(), key.into()));
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn sweep_config(mut self, config: SweepConfig) -> Self {
        self.sweep_config = config;
        self
    }

    pub fn gate_config(mut self, config: GateConfig) -> Self {
        self.gate_config = config;
        self
    }

    pub fn static_config(mut self, config: StaticConfig) -> Self {
        self.static_config = config;
        self
    }

    /// Shorthand for changing only the document root.
    pub fn document_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_config.document_root = root.into();
        self
    }

    /// Sets the credentials the login form is checked against.
    pub fn credentials(mut self, table: CredentialTable) -> Self {
        self.credentials = table;
        self
    }

    /// Connects to a messaging broker while the server runs.
    pub fn broker(mut self, config: BrokerConfig) -> Self {
        self.broker = Some(config);
        self
    }

    /// Binds the listener and assembles the router.
    ///
    /// Nothing runs until [`PortcullisServer::run`] is called.
    ///
    /// # Errors
    /// - [`PortcullisError::Transport`] if binding or loading TLS material fails.
    /// - [`PortcullisError::Broker`] if the broker configuration is invalid.
    pub async fn build(self) -> Result<PortcullisServer, PortcullisError> {
        if let Some(broker) = &self.broker {
            broker.validate()?;
        }

        let listener: Listener = match self.tls {
            #[cfg(feature = "tls")]
            Some((cert, key)) => {
                portcullis_transport::TlsTransport::bind(&self.bind_addr, &cert, &key)
                    .await?
                    .into()
            }
            #[cfg(not(feature = "tls"))]
            Some(_) => {
                tracing::warn!("built without TLS support, serving plain HTTP");
                TcpTransport::bind(&self.bind_addr).await?.into()
            }
            None => TcpTransport::bind(&self.bind_addr).await?.into(),
        };

        let store = SessionStore::shared(self.session_config.validated());
        let gate = LoginGate::new(self.gate_config, self.credentials, store.clone()).shared();
        let router = router(gate, &self.static_config);

        Ok(PortcullisServer {
            listener,
            store,
            router,
            sweep_config: self.sweep_config.validated(),
            broker: self.broker,
        })
    }
}

impl Default for PortcullisServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Portcullis server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct PortcullisServer {
    listener: Listener,
    store: SharedStore,
    router: Router,
    sweep_config: SweepConfig,
    broker: Option<BrokerConfig>,
}

impl PortcullisServer {
    /// Creates a new builder.
    pub fn builder() -> PortcullisServerBuilder {
        PortcullisServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, PortcullisError> {
        Ok(self.listener.local_addr()?)
    }

    /// The session store shared by the gate and the sweeper.
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), PortcullisError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the server accept loop until `shutdown` completes.
    ///
    /// Starts the sweeper and (if configured) the broker client, then
    /// accepts connections and serves each on its own task. On shutdown
    /// the sweeper is stopped and the broker disconnected; connections
    /// already being served are left to finish on their own.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), PortcullisError> {
        let sweeper = Sweeper::spawn(self.store.clone(), self.sweep_config.clone());
        let broker = self.broker.as_ref().map(BrokerClient::connect).transpose()?;

        tracing::info!(addr = ?self.listener.local_addr().ok(), "Portcullis server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(incoming) => {
                        let router = self.router.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(incoming, router).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("shutting down");
        let metrics = sweeper.shutdown().await;
        tracing::info!(
            sweeps = metrics.total_sweeps,
            evicted = metrics.total_evicted,
            "sweeper stopped"
        );
        if let Some(broker) = broker {
            if let Err(e) = broker.disconnect().await {
                tracing::warn!(error = %e, "broker disconnect failed");
            }
        }
        Ok(())
    }
}
