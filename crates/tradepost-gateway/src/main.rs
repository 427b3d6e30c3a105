// Tradepost gateway server.

use anyhow::{Context, Result};
use tradepost_auth::{spawn_sweeper, AuthConfig, RevocationStore, TokenService};
use tradepost_core::{telemetry, Role};
use tradepost_gateway::{
    build_app,
    config::{AdminConfig, GatewayConfig},
    storage::{password::hash_password, CreateUserRow, StorageBackend},
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("tradepost_gateway=debug,tower_http=debug");

    tracing::info!("tradepost gateway starting...");

    let config = GatewayConfig::from_env();
    let auth_config = AuthConfig::from_env();

    let db = match &config.database_url {
        Some(url) => {
            let db = StorageBackend::postgres(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            db
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (dev mode)");
            StorageBackend::in_memory()
        }
    };

    // The revocation store lives next to the users so a single database
    // backs both; in dev mode it is process-local like everything else.
    let revocation = match db.pool() {
        Some(pool) => RevocationStore::postgres(pool.clone()),
        None => RevocationStore::in_memory(),
    };

    if let Some(admin) = &config.admin {
        bootstrap_admin(&db, admin)
            .await
            .context("Failed to bootstrap admin user")?;
    }

    spawn_sweeper(revocation.clone(), auth_config.sweep_interval);

    let state = AppState {
        db,
        tokens: TokenService::new(&auth_config.jwt),
        revocation,
        http: reqwest::Client::new(),
        upstreams: config.upstreams.clone(),
    };
    let app = build_app(state, &auth_config);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("gateway listening on {}", config.listen_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Create the bootstrap admin account unless it already exists.
async fn bootstrap_admin(db: &StorageBackend, admin: &AdminConfig) -> Result<()> {
    if db.get_user_by_email(&admin.email).await?.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(&admin.password)?;
    db.create_user(CreateUserRow {
        email: admin.email.clone(),
        name: "Admin".to_string(),
        password_hash,
        role: Role::Admin.as_str().to_string(),
    })
    .await?;

    tracing::info!(email = %admin.email, "bootstrapped admin user");
    Ok(())
}
