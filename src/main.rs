//! MCP Dashboard server
//!
//! Entry point: load configuration, set up logging, serve the dashboard.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use mcp_dashboard::config::AppConfig;
use mcp_dashboard::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing (M-LOG-STRUCTURED)
    let json = config.logging.json;
    tracing_subscriber::registry()
        .with((!json).then(|| fmt::layer().with_target(true)))
        .with(json.then(|| fmt::layer().json().with_target(true)))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(
        name: "config.loaded",
        address = %config.server.address(),
        connect_timeout_secs = config.mcp.connect_timeout_secs,
        call_timeout_secs = config.mcp.call_timeout_secs,
        servers_file = ?config.mcp.servers_file,
        "Configuration loaded"
    );

    server::start_server(Arc::new(config)).await
}
