//! `scip-server` binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use scip_server::{AppContext, ScipServer, ServerConfig};
use scip_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use tracing::{error, info, warn};

/// SCiPnet terminal server.
#[derive(Debug, Parser)]
#[command(name = "scip-server", version, about)]
struct Cli {
    /// Address to listen on (overrides SCIP_BIND_ADDR)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Deepwell directory holding records.json and text blobs (overrides SCIP_DEEPWELL_DIR)
    #[arg(long)]
    deepwell: Option<PathBuf>,

    /// Skip the connection probe handshake
    #[arg(long)]
    no_probe: bool,
}

impl Cli {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            config.network.bind_addr = bind;
        }
        if let Some(dir) = self.deepwell {
            config.storage.deepwell_dir = dir;
        }
        if self.no_probe {
            config.socket.require_probe = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = init_telemetry(TelemetryConfig::for_service("scip-server"))
        .context("initializing telemetry")?;

    let mut config = ServerConfig::from_env().context("reading configuration")?;
    cli.apply(&mut config);
    config.validate().context("validating configuration")?;

    let ctx = AppContext::build(&config.storage).await.with_context(|| {
        format!(
            "loading deepwell from {}",
            config.storage.deepwell_dir.display()
        )
    })?;

    let server = ScipServer::bind(&config, Arc::new(ctx))
        .await
        .with_context(|| format!("binding {}", config.network.bind_addr))?;
    server.run_until(shutdown_signal()).await?;

    match encode_metrics() {
        Ok(snapshot) => info!(metrics = %snapshot, "Final metrics snapshot"),
        Err(e) => warn!(error = %e, "Could not encode metrics"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Ctrl-C handler unavailable; serving until killed");
        std::future::pending::<()>().await;
    }
}
