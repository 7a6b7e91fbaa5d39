//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness check
//! GET    /health/ready            - Readiness (data directory reachable)
//! GET    /api/health              - JSON health check
//! GET    /api/check-pincode       - Pickup serviceability (?code=)
//!
//! # Donations
//! POST   /api/donations           - Record a donation (multipart, files "images")
//! GET    /api/donations           - All donations, newest first
//! GET    /api/donations/{id}      - One donation
//!
//! # Catalog
//! POST   /api/products            - Create a product (multipart, file "image")
//! GET    /api/products            - All products
//! GET    /api/products/{id}       - One product
//! PUT    /api/products/{id}       - Update a product
//! DELETE /api/products/{id}       - Delete a product
//! ```
//!
//! Uploaded files are served from `/uploads` by [`crate::app`].

pub mod donations;
pub mod form;
pub mod pincode;
pub mod products;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use crate::state::AppState;

/// Largest request body accepted: six donation photos plus form fields.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Create the donation routes router.
pub fn donation_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(donations::index).post(donations::create))
        .route("/{id}", get(donations::show))
}

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(api_health))
        .route("/check-pincode", get(pincode::check))
        .nest("/donations", donation_routes())
        .nest("/products", product_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the data directory is gone.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match tokio::fs::metadata(&state.config().data_dir).await {
        Ok(meta) if meta.is_dir() => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn api_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
