//! QuantDesk API server binary.
//!
//! Usage:
//!   quantdesk-api --config config.toml
//!   quantdesk-api --port 8080
//!   quantdesk-api --port 8080 --bind 0.0.0.0
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY` / `OPENAI_API_KEY` - provider credentials
//! - `QUANTDESK_BIND_ADDR` - server bind address (default: 127.0.0.1)
//! - `MARKET_API_KEY` - market-data API key
//! - `SANDBOX_URL` - code-execution sandbox base URL
//! - `CHART_BUCKET` - object-store bucket for chart images

use quantdesk_api::{serve, AppState};
use quantdesk_coordinator::OrchestratorConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,quantdesk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut port: u16 = 8080;
    let mut config_path: Option<String> = None;
    let mut bind_addr: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = args[i + 1]
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid port number: {}", args[i + 1]))?;
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    bind_addr = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("QuantDesk API Server");
                println!();
                println!("Usage: quantdesk-api [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --port <PORT>    Port to listen on (default: 8080)");
                println!(
                    "  -b, --bind <ADDR>    Bind address (default: 127.0.0.1, env: QUANTDESK_BIND_ADDR)"
                );
                println!("  -c, --config <FILE>  Path to config.toml file");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    // CLI flag > env var > loopback default.
    let host = bind_addr
        .or_else(|| std::env::var("QUANTDESK_BIND_ADDR").ok())
        .unwrap_or_else(|| "127.0.0.1".to_string());

    if host == "0.0.0.0" {
        tracing::warn!(
            "Server binding to 0.0.0.0 — this exposes the API to all network interfaces. \
             Ensure a firewall is in place."
        );
    }

    let config = if let Some(path) = config_path {
        tracing::info!(path = %path, "Loading configuration");
        OrchestratorConfig::from_file(&path)?
    } else {
        tracing::info!("Using default configuration");
        OrchestratorConfig::default()
    };

    let state = AppState::from_config(&config)?;

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    serve(Arc::new(state), addr).await?;

    Ok(())
}
