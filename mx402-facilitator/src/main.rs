//! MultiversX x402 facilitator HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p mx402-facilitator --release
//!
//! # Run with custom config path
//! mx402-facilitator --config /path/to/config.toml
//!
//! # Configure logging level
//! RUST_LOG=debug mx402-facilitator
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `config.toml`)
//! - `HOST`, `PORT` - Override bind address (default: `0.0.0.0:3000`)
//! - `NETWORK_PROVIDER` / `MULTIVERSX_API_URL` - Override gateway URL
//! - `NETWORK`, `QUOTA_LIMIT`, `DB_PATH`, `GATEWAY_TIMEOUT_MS` - See `mx402_facilitator::config`
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use clap::Parser;
use mx402::gateway::HttpGateway;
use mx402::quota::QuotaTracker;
use tower_http::cors;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use mx402_facilitator::config::FacilitatorConfig;
use mx402_facilitator::handlers::{Facilitator, facilitator_router};
use mx402_facilitator::probe::probe_gateway;
use mx402_facilitator::util::SigDown;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!("Facilitator failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = FacilitatorConfig::load(&args.config)?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        gateway = %config.gateway_url,
        network = %config.network,
        quota_limit = config.quota_limit,
        db_path = %config.db_path,
        "Loaded configuration"
    );

    let gateway =
        HttpGateway::new(config.gateway_url.clone()).with_timeout(config.gateway_timeout());
    if config.probe_gateway {
        probe_gateway(&gateway, &config.network).await?;
    } else {
        tracing::warn!("Gateway probe disabled; chain id not checked");
    }

    let quota = Arc::new(QuotaTracker::load(config.quota_limit, &config.db_path)?);
    let facilitator = Facilitator::new(
        Arc::new(gateway),
        Arc::clone(&quota),
        config.network.clone(),
    )
    .with_timeout(config.gateway_timeout());

    let app = facilitator_router(Arc::new(facilitator))
        .layer(TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let sig_down = SigDown::try_new()?;
    let shutdown = sig_down.cancellation_token();

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Facilitator listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    sig_down.recv().await;

    quota.persist()?;
    if let Some(path) = quota.snapshot_path() {
        tracing::info!(path = %path.display(), "Quota persisted");
    }
    tracing::info!("Facilitator shut down gracefully");
    Ok(())
}
