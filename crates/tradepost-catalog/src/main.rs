// Tradepost catalog server.

use anyhow::{Context, Result};
use tradepost_catalog::{app, config::CatalogConfig, store::ProductStore};
use tradepost_core::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("tradepost_catalog=debug,tower_http=debug");

    tracing::info!("tradepost catalog starting...");
    // Identity arrives as trusted headers; this only holds behind the
    // gateway's network boundary.
    tracing::warn!(
        "catalog trusts x-user-* headers from the edge; never expose this service publicly"
    );

    let config = CatalogConfig::from_env();
    let app = app(ProductStore::new());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("catalog listening on {}", config.listen_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
