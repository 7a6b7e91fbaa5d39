//! Pickup serviceability lookup.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use recraft_core::Serviceability;

use crate::error::Result;
use crate::state::AppState;

/// Query string for `GET /api/check-pincode`.
#[derive(Debug, Deserialize)]
pub struct PincodeQuery {
    #[serde(default)]
    pub code: String,
}

/// Classify a pincode.
///
/// Malformed codes answer 400 with the same body shape as a classification.
#[instrument(skip(state), fields(code = %query.code))]
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<PincodeQuery>,
) -> Result<(StatusCode, Json<Serviceability>)> {
    let result = state.checker().check(&query.code).await?;

    let status = if result.is_format_rejection() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result)))
}
