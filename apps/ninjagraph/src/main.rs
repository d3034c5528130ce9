//! # ninjagraph - Build Graph Server
//!
//! The main binary for the ninjagraph dependency-graph service.
//!
//! One process serves one surface, chosen at startup:
//! - HTTP/JSON REST API (axum)
//! - gRPC API with health and reflection (tonic)
//!
//! Both surfaces map onto the same `ninjagraph-core` logic over a single
//! persistent quad store.

use clap::Parser;
use ninjagraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing - NINJAGRAPH_LOG_FORMAT=json enables
    // machine-parseable output.
    let log_format = std::env::var("NINJAGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ninjagraph=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {e}");
        std::process::exit(1);
    }
}
