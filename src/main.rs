//! `prefixlistd`: runs the prefix list source and admin surface.
//!
//! # Architecture Overview
//!
//! ```text
//!   YAML directory ──notify──▶ DirectorySource ─┐
//!                                               ├─ events ─▶ PrefixListAdapter ─▶ RoutingTable
//!   resource informer (namespace mode) ─────────┘                                    │
//!                                                                                    ▼
//!   DNS pipeline ─▶ PrefixListPlugin ─▶ "edgecdnxprefixlist/location" ◀── lazy locate()
//!   admin HTTP   ─▶ /ready /status /locate/{ip} ───────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use edge_prefixlist::admin::{self, AdminState};
use edge_prefixlist::config::{load_config, DaemonConfig};
use edge_prefixlist::lifecycle::{self, signals, Shutdown};
use edge_prefixlist::observability::{logging, metrics};
use edge_prefixlist::plugin::setup::parse_args;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "prefixlistd")]
#[command(about = "Location lookup over live prefix lists", long_about = None)]
struct Cli {
    /// Prefix list source: a directory of YAML files or a namespace.
    identifier: Vec<String>,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DaemonConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "prefixlistd starting");

    let identifier = parse_args(&cli.identifier)?.standalone()?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let running = lifecycle::start(identifier, &config.source, &shutdown)?;

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState {
            table: running.table().clone(),
            adapter: running.adapter().clone(),
        };
        Some(tokio::spawn(admin::serve(listener, state, shutdown.clone())))
    } else {
        None
    };

    signals::wait_for_shutdown_signal().await;
    shutdown.trigger();

    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin server failed"),
            Err(e) => tracing::error!(error = %e, "Admin task panicked"),
            Ok(Ok(())) => {}
        }
    }
    running.join(SHUTDOWN_TIMEOUT).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
