//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Bodies are JSON: `{"message": ...}` for missing resources and
//! `{"error": ...}` for everything else. Validation failures also carry the
//! per-field map under `errors`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::kv::StoreError;
use crate::services::{ServiceabilityError, UploadError, ValidationErrors};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Remote serviceability lookup failed.
    #[error("Serviceability error: {0}")]
    Serviceability(#[from] ServiceabilityError),

    /// Storing an uploaded file failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// One or more form fields are invalid.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Resource not found. The message is shown to the client as is.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from client. The message is shown to the client as is.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Repository(err.into())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl AppError {
    /// Whether this is a server-side failure worth reporting.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Repository(RepositoryError::Storage(
                StoreError::Io(_) | StoreError::Serialize(_) | StoreError::InvalidKey(_)
            )) | Self::Upload(_)
                | Self::Internal(_)
                | Self::Serviceability(_)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Repository(err) => match err {
                RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_)
                | RepositoryError::OutOfStock(_)
                | RepositoryError::Storage(StoreError::StaleWrite { .. }) => StatusCode::CONFLICT,
                RepositoryError::Invalid(_) => StatusCode::BAD_REQUEST,
                RepositoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Serviceability(_) => StatusCode::BAD_GATEWAY,
            Self::Upload(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match &self {
            Self::NotFound(message) => json!({ "message": message }),
            Self::Repository(RepositoryError::NotFound(what)) => {
                json!({ "message": format!("Not found: {what}") })
            }
            Self::Repository(RepositoryError::Invalid(message)) | Self::BadRequest(message) => {
                json!({ "error": message })
            }
            Self::Repository(RepositoryError::Conflict(message)) => json!({ "error": message }),
            Self::Repository(RepositoryError::OutOfStock(name)) => {
                json!({ "error": format!("{name} is out of stock") })
            }
            Self::Validation(errors) => json!({
                "error": errors.iter().next().map_or("Invalid request", |(_, m)| m),
                "errors": errors,
            }),
            Self::Repository(RepositoryError::Storage(StoreError::StaleWrite { .. })) => {
                json!({ "error": "The data changed while saving; please try again" })
            }
            Self::Serviceability(_) => json!({ "error": "Serviceability lookup failed" }),
            Self::Repository(RepositoryError::Storage(_)) | Self::Upload(_) | Self::Internal(_) => {
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("donation", "Donation recorded", Some(&[("donation_id", "DON-4K2ZQ8")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
