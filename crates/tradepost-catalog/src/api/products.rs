// Product routes.
//
// The decision filter in front of this router has already classified the
// route and established the principal (from propagated headers), so
// handlers only deal with ownership and data. The /products/user/* routes
// are internal-only: they run with system-level trust and no principal.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use tradepost_auth::AuthError;
use tradepost_core::Principal;

use crate::store::Product;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/my-products", get(my_products))
        .route(
            "/products/user/:owner",
            get(products_by_owner).delete(delete_products_by_owner),
        )
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// GET /products - public browse.
pub async fn list_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.store.list())
}

/// GET /products/:id - public browse.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AuthError> {
    state
        .store
        .get(&id)
        .map(Json)
        .ok_or_else(|| AuthError::not_found("Product not found"))
}

/// POST /products - sellers create listings under their own subject.
pub async fn create_product(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AuthError> {
    if req.name.trim().is_empty() {
        return Err(AuthError::bad_request("Product name is required"));
    }

    let product = state
        .store
        .create(req.name, req.description, req.price, principal.subject);
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/:id - owners manage their own listings.
pub async fn update_product(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, AuthError> {
    let existing = state
        .store
        .get(&id)
        .ok_or_else(|| AuthError::not_found("Product not found"))?;
    ensure_owner(&principal, &existing)?;

    state
        .store
        .update(&id, req.name, req.description, req.price)
        .map(Json)
        .ok_or_else(|| AuthError::not_found("Product not found"))
}

/// DELETE /products/:id - owners manage their own listings.
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, AuthError> {
    let existing = state
        .store
        .get(&id)
        .ok_or_else(|| AuthError::not_found("Product not found"))?;
    ensure_owner(&principal, &existing)?;

    state.store.delete(&id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /products/my-products - listings of the calling principal.
pub async fn my_products(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Json<Vec<Product>> {
    Json(state.store.list_by_owner(&principal.subject))
}

/// GET /products/user/:owner - internal: listings of a given user.
pub async fn products_by_owner(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Json<Vec<Product>> {
    Json(state.store.list_by_owner(&owner))
}

/// DELETE /products/user/:owner - internal: user-deletion fan-out.
pub async fn delete_products_by_owner(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> StatusCode {
    let removed = state.store.delete_by_owner(&owner);
    tracing::debug!(owner = %owner, removed, "removed listings for deleted user");
    StatusCode::NO_CONTENT
}

fn ensure_owner(principal: &Principal, product: &Product) -> Result<(), AuthError> {
    if principal.is_admin() || product.owner == principal.subject {
        Ok(())
    } else {
        Err(AuthError::forbidden("Not your listing"))
    }
}
