use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use portcullis::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "portcullisd")]
#[command(about = "Session-gated access control in front of a static web application")]
#[command(version)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long)]
    pub debug: bool,

    /// Messaging broker host
    #[arg(long, default_value = "127.0.0.1")]
    pub mqtt_host: String,

    /// Messaging broker port
    #[arg(long, default_value_t = 1883)]
    pub mqtt_port: u16,

    /// Port to serve HTTP(S) on
    #[arg(long, default_value_t = 8443)]
    pub http_port: u16,

    /// Address to serve HTTP(S) on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Document root for static files
    #[arg(long, default_value = "./www")]
    pub document: PathBuf,

    /// File served for directory paths
    #[arg(long, default_value = "index.html")]
    pub index: String,

    /// Extra login, as username:password (repeatable)
    #[arg(long = "http-auth", value_name = "USER:PASS")]
    pub http_auth: Vec<Credential>,

    /// TLS certificate chain (PEM or DER)
    #[arg(long, default_value = "server.pem")]
    pub ssl_cert: PathBuf,

    /// TLS private key (PEM or DER)
    #[arg(long, default_value = "server.key")]
    pub ssl_key: PathBuf,

    /// Serve plain HTTP instead of HTTPS
    #[arg(long)]
    pub plain: bool,
}

impl Cli {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.http_port)
    }

    /// The default login plus every `--http-auth` that fits.
    pub fn credentials(&self) -> CredentialTable {
        let mut table = CredentialTable::default();
        for credential in &self.http_auth {
            if let Err(e) = table.push(credential.clone()) {
                tracing::warn!(identity = %credential.identity, error = %e, "ignoring extra login");
            }
        }
        table
    }

    pub fn static_config(&self) -> StaticConfig {
        StaticConfig {
            document_root: self.document.clone(),
            index_file: self.index.clone(),
        }
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            host: self.mqtt_host.clone(),
            port: self.mqtt_port,
            ..Default::default()
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn default_log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}
