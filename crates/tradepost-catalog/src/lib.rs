// Tradepost catalog service (internal).
//
// Runs the shared decision filter in internal trust mode: identity arrives
// exclusively as the x-user-* headers stamped by the gateway, and the
// internal-only /products/user/* routes run with system-level trust.
//
// HARDENING: the application layer cannot tell a forged identity header
// from a genuine one. This service must only ever be reachable from the
// gateway and sibling services (private network / service mesh); exposing
// it publicly voids the trust model.

pub mod api;
pub mod config;
pub mod store;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tradepost_auth::{authenticate, AuthFilter};

use store::ProductStore;

/// App state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub store: ProductStore,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Assemble the catalog router behind the internal-mode filter.
pub fn app(store: ProductStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api::products::routes())
        .layer(middleware::from_fn_with_state(
            AuthFilter::Internal,
            authenticate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { store })
}
