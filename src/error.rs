// Pipeline and HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

use crate::database::StoreError;
use crate::validation::Issue;

/// Every way an update request can fail.
///
/// All variants render through the same `{ success: false, error }` envelope so
/// clients can branch on `success` alone.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("No body provided!")]
    NoBody,

    #[error("Validation failed")]
    ValidationError(Vec<Issue>),

    #[error("No access token provided!")]
    NoAccessToken,

    #[error("Invalid access token!")]
    InvalidAccessToken,

    #[error("You are not an admin!")]
    NotAdmin,

    #[error("Invalid profile ID!")]
    InvalidProfileId,

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl PreferencesError {
    /// HTTP status code. Precondition failures share 200 like the rest of the envelope API.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PreferencesError::Persistence(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            PreferencesError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }

    /// Error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            PreferencesError::NoBody => "NO_BODY",
            PreferencesError::ValidationError(_) => "VALIDATION_ERROR",
            PreferencesError::NoAccessToken => "NO_ACCESS_TOKEN",
            PreferencesError::InvalidAccessToken => "INVALID_ACCESS_TOKEN",
            PreferencesError::NotAdmin => "NOT_ADMIN",
            PreferencesError::InvalidProfileId => "INVALID_PROFILE_ID",
            PreferencesError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            PreferencesError::ValidationError(issues) => json!({
                "success": false,
                "error": issues,
            }),
            PreferencesError::Persistence(StoreError::NotFound(_)) => json!({
                "success": false,
                "error": self.to_string(),
            }),
            // Don't expose internal storage errors to clients
            PreferencesError::Persistence(_) => json!({
                "success": false,
                "error": "Something went wrong!",
            }),
            _ => json!({
                "success": false,
                "error": self.to_string(),
            }),
        }
    }
}

// Automatic HTTP response conversion for Axum
impl IntoResponse for PreferencesError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
