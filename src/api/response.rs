use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Wrapper for API responses that automatically adds the success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub result: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(result: T) -> Self {
        Self { result }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        // Convert result to JSON Value for consistent envelope format
        let result_value = match serde_json::to_value(&self.result) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response result: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to serialize response result"
                    })),
                )
                    .into_response();
            }
        };

        (StatusCode::OK, Json(envelope(result_value))).into_response()
    }
}

fn envelope(result: Value) -> Value {
    json!({
        "success": true,
        "result": result
    })
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::PreferencesError>;
