//! Order gateway.
//!
//! ```text
//!   client ──HTTP──▶ http::server ──▶ http::handler ──▶ logic::CreateLogic
//!                                                            │
//!                                                            ▼
//!                     discovery ──▶ load_balancer ◀── rpc::OrderClient
//!                                         │
//!                                         ▼
//!                                  order service (RPC)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use order_gateway::config::load_config;
use order_gateway::observability::{logging, metrics};
use order_gateway::{HttpServer, ServiceContext, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "order-gateway", version, about = "HTTP gateway for the order service")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short = 'f', long = "config", default_value = "etc/order-api.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init(&config.observability);

    tracing::info!(
        name = %config.name,
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

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

    let bind_address = config.listener.bind_address.clone();
    let svc = match ServiceContext::initialize(config).await {
        Ok(svc) => Arc::new(svc),
        Err(e) => {
            tracing::error!(error = %e, "Service initialization failed");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&bind_address).await?;
    let local_addr = listener.local_addr()?;
    println!("Starting server at {local_addr}...");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    HttpServer::new(svc).run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
