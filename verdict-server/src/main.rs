use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};
use verdict_core::VerdictConfig;

use verdict_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "verdict.toml")]
    config: String,

    /// Check config, model backend and review log, then exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (HF_API_TOKEN in development)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match VerdictConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over [service] log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let state = match HttpState::from_config(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to initialise model backend: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        let (status, body) = http::health_inner(&state).await;
        if status.is_success() {
            println!("✅ Model backend: {}", body["backend"].as_str().unwrap_or("?"));
            println!("✅ Review log:    {}", body["store"].as_str().unwrap_or("?"));
            println!("✅ Reviews:       {}", body["reviews"]);
            println!("✅ Verdict health check passed");
            return Ok(());
        }
        println!("❌ Review log unreadable: {}", body["error"].as_str().unwrap_or("?"));
        std::process::exit(1);
    }

    if !state.config.http.enabled {
        tracing::warn!("HTTP API disabled in config; nothing to serve");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    tracing::info!(
        backend = state.backend.name(),
        store = %state.config.store.path,
        "Starting Verdict"
    );
    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
