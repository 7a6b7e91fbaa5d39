//! ReCraft storefront library.
//!
//! Marketplace state (accounts, listings, cart, orders, donations) lives in a
//! JSON document store; the REST API over donations, the artisan catalog and
//! pickup serviceability is built by [`app`]. The binary and the integration
//! tests share this router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::services::uploads::UPLOADS_PREFIX;
use crate::state::AppState;

/// Build the application router with its middleware stack.
///
/// Sentry layers are left to the caller so tests can run without a hub.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origin);

    Router::new()
        .merge(routes::routes())
        .nest_service(UPLOADS_PREFIX, ServeDir::new(state.uploads().dir()))
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
}

/// CORS for the browser storefront: one origin, credentials allowed.
fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
        Err(_) => {
            tracing::warn!(origin, "CORS origin is not a valid header value; cross-origin requests disabled");
            layer
        }
    }
}
