// handlers/preferences.rs - preference and rights routes
//
// Update routes take the raw body so a missing body can be told apart from a
// malformed one; the pipeline does all parsing.

use std::borrow::Cow;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, State},
    http::{HeaderMap, StatusCode},
};
use tracing::warn;

use crate::api::response::{ApiResponse, ApiResult};
use crate::error::PreferencesError;
use crate::pipeline::{PreferencesPolicy, StaffModePolicy};
use crate::services::RightsServiceError;
use crate::state::AppState;
use crate::types::RightsRecord;
use crate::validation::Issue;

pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Header value as text. Non-ASCII bytes are kept (lossily) so a present but
/// unreadable token fails verification instead of counting as absent.
fn access_token(headers: &HeaderMap) -> Option<Cow<'_, str>> {
    headers
        .get(ACCESS_TOKEN_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
}

/// Turn a body the extractor refused (e.g. over the size limit) into a
/// validation failure so the response keeps the error envelope.
fn buffered(body: Result<Bytes, BytesRejection>) -> Result<Bytes, PreferencesError> {
    body.map_err(|rejection| {
        let too_large = rejection.status() == StatusCode::PAYLOAD_TOO_LARGE;
        warn!("request body rejected: {}", rejection.body_text());
        PreferencesError::ValidationError(vec![Issue::unreadable_body(too_large, rejection.body_text())])
    })
}

/// POST /updatePreferences - merge preference flags into a profile's rights
pub async fn update_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<RightsRecord> {
    let body = buffered(body)?;
    let record = state
        .pipeline
        .run(&PreferencesPolicy, &body, access_token(&headers).as_deref())
        .await?;
    Ok(ApiResponse::success(record))
}

/// POST /updateStaffMode - toggle staff mode on an owned staff profile
pub async fn update_staff_mode(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<RightsRecord> {
    let body = buffered(body)?;
    let record = state
        .pipeline
        .run(&StaffModePolicy, &body, access_token(&headers).as_deref())
        .await?;
    Ok(ApiResponse::success(record))
}

/// GET /getPreferences/:id - rights of one profile
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<RightsRecord> {
    let record = state.rights.get(&id).await?;
    Ok(ApiResponse::success(record))
}

/// GET /getVerified - ids of verified profiles
pub async fn get_verified(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let ids = state.rights.verified_ids().await?;
    Ok(ApiResponse::success(ids))
}

impl From<RightsServiceError> for PreferencesError {
    fn from(err: RightsServiceError) -> Self {
        match err {
            RightsServiceError::Store(e) => {
                tracing::error!("rights read failed: {}", e);
                PreferencesError::Persistence(e)
            }
        }
    }
}
