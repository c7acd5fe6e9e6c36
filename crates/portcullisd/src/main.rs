//! portcullisd: serves a static site behind the Portcullis login gate.
//!
//! Runs on a single-threaded runtime. Ctrl-C stops the accept loop, the
//! session sweeper and the broker connection.

mod cli;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use portcullis::PortcullisServer;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` wins when set; otherwise `-d` selects debug.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.default_log_level());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let bind_addr = cli.bind_addr().to_string();

    let mut builder = PortcullisServer::builder()
        .bind(&bind_addr)
        .static_config(cli.static_config())
        .credentials(cli.credentials())
        .broker(cli.broker_config());
    if !cli.plain {
        builder = builder.tls(cli.ssl_cert.clone(), cli.ssl_key.clone());
    }

    let server = builder
        .build()
        .await
        .with_context(|| format!("failed to start listener on {bind_addr}"))?;

    info!(
        addr = %server.local_addr()?,
        tls = !cli.plain,
        document_root = %cli.document.display(),
        "portcullisd started"
    );

    server.run_until(shutdown_signal()).await?;
    info!("portcullisd stopped");
    Ok(())
}

/// Resolves on Ctrl-C. If the signal handler can't be installed the
/// server runs until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received"),
        Err(e) => {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
