//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. CORS (browser storefront origin)
//! 3. `TraceLayer` (request span with a `request_id` field)
//! 4. Request ID (fills that field and echoes `x-request-id`)

pub mod request_id;

pub use request_id::request_id_middleware;
