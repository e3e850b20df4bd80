//! liveset gateway
//!
//! Serves the demo schema over HTTP and WebSocket:
//! 1. Clients open `/api/v1/live` and subscribe to live queries on channels
//! 2. Writes through `PUT`/`PATCH`/`DELETE` push fresh results to subscribers
//!
//! Usage:
//!   liveset-gateway --port 4100
//!
//! State lives in memory; subscribers re-subscribe after a restart.

use anyhow::{Context, Result};
use clap::Parser;
use liveset_gateway::build_router;
use liveset_gateway::demo::{demo_state, seed};
use liveset_live::{LiveConfig, OrderingPolicy};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "liveset-gateway")]
#[command(about = "Live query gateway over an in-memory demo store")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, default_value = "4100")]
    port: u16,

    /// Upper bound for one live query recompute, in milliseconds (0 disables)
    #[arg(long, default_value = "30000")]
    recompute_timeout_ms: u64,

    /// Deliver each subscription's pushes in trigger order
    #[arg(long)]
    serialize_pushes: bool,

    /// Start with an empty store instead of the demo rows
    #[arg(long)]
    empty: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("liveset gateway starting...");
    let config = LiveConfig {
        ordering: if args.serialize_pushes {
            OrderingPolicy::Serialized
        } else {
            OrderingPolicy::CompletionOrder
        },
        recompute_timeout_ms: args.recompute_timeout_ms,
    };
    let (state, store) = demo_state(config);
    if !args.empty {
        seed(&store).await.context("Failed to seed demo rows")?;
    }

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", args.port))?;
    info!("Listening on port {}", args.port);
    info!(
        "Serving entity types: {}",
        state.collections.entity_types().collect::<Vec<_>>().join(", ")
    );

    axum::serve(listener, build_router(state))
        .await
        .context("HTTP server failed")?;
    Ok(())
}
