//! EV route server - weather-aware trip and charging-stop planning over HTTP

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use evroute_server::api;
use evroute_server::config::Config;
use evroute_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    let filter = EnvFilter::from_default_env().add_directive("evroute_server=debug".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting EV route server...");

    let port = config.server_port;
    let state = Arc::new(AppState::new(config)?);
    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        return;
    }
    tracing::info!("Shutdown signal received");
}
