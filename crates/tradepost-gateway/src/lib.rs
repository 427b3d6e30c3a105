// Tradepost API gateway (the edge).
//
// The gateway is the only component that ever sees a user credential: it
// authenticates every inbound request against the shared auth core, serves
// the token lifecycle endpoints itself, and forwards everything else to the
// internal services with verified identity propagated as trusted headers.

pub mod config;
pub mod proxy;
pub mod routes;
pub mod storage;

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tradepost_auth::{authenticate, AuthConfig, AuthFilter, RevocationStore, TokenService};

use proxy::Upstreams;
use storage::StorageBackend;

/// App state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub db: StorageBackend,
    pub tokens: TokenService,
    pub revocation: RevocationStore,
    pub http: reqwest::Client,
    pub upstreams: Upstreams,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    storage: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: if state.db.is_dev_mode() {
            "in-memory"
        } else {
            "postgres"
        },
    })
}

/// Assemble the gateway router. The edge-mode filter wraps every route,
/// including the fallback proxy, so no path escapes the decision filter.
pub fn build_app(state: AppState, auth_config: &AuthConfig) -> Router {
    let filter = AuthFilter::edge(
        state.tokens.clone(),
        state.revocation.clone(),
        auth_config.revocation_timeout,
    );

    Router::new()
        .route("/health", get(health))
        .merge(routes::auth::routes())
        .fallback(proxy::forward)
        .layer(middleware::from_fn_with_state(filter, authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
