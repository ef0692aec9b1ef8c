use anyhow::Context;
use tracing::info;

use crate::app::{app, AppState};
use crate::database::DatabaseManager;

const DEFAULT_PORT: u16 = 3000;

pub async fn handle(port: Option<u16>) -> anyhow::Result<()> {
    let config = super::load_config()?;
    info!("Starting Catalog API in {:?} mode", config.environment);

    let store = DatabaseManager::open_store(&config.database)
        .await
        .context("failed to open catalog store")?;
    if config.database.url.is_none() {
        super::user::bootstrap_admin(store.as_ref(), &config.security).await?;
    }

    let port = port.unwrap_or_else(port_from_env);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Catalog API listening on http://{} (prefix {})", bind_addr, config.api.prefix);

    let router = app(AppState::new(store, config));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Catalog API stopped");
    Ok(())
}

/// Allow tests or deployments to override the port via env
fn port_from_env() -> u16 {
    std::env::var("CATALOG_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
