use serde::Deserialize;

use super::{ApplyMode, Authorization, UpdatePolicy};
use crate::types::{RightsField, RightsPatch};
use crate::validation::{FieldSpec, FieldType, Shape};

const SHAPE: Shape = Shape::new(&[
    FieldSpec::required("id", FieldType::String),
    FieldSpec::optional("isStaff", FieldType::Boolean),
    FieldSpec::optional("isGardener", FieldType::Boolean),
    FieldSpec::optional("isTrustedMember", FieldType::Boolean),
    FieldSpec::optional("isVerified", FieldType::Boolean),
    FieldSpec::optional("isPride", FieldType::Boolean),
    FieldSpec::optional("highSignalNotificationFilter", FieldType::Boolean),
    FieldSpec::optional("updateByAdmin", FieldType::Boolean),
]);

/// Body of `POST /updatePreferences`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub id: String,
    pub is_staff: Option<bool>,
    pub is_gardener: Option<bool>,
    pub is_trusted_member: Option<bool>,
    pub is_verified: Option<bool>,
    pub is_pride: Option<bool>,
    pub high_signal_notification_filter: Option<bool>,
    pub update_by_admin: Option<bool>,
}

/// Merge preference flags into a profile's rights.
///
/// Privileged flags only pass on the admin branch; on the owner branch they
/// are dropped without failing the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferencesPolicy;

impl UpdatePolicy for PreferencesPolicy {
    type Request = PreferencesRequest;

    fn name(&self) -> &'static str {
        "preferences/updatePreferences"
    }

    fn shape(&self) -> Shape {
        SHAPE
    }

    fn profile_id<'a>(&self, request: &'a PreferencesRequest) -> &'a str {
        &request.id
    }

    fn admin_requested(&self, request: &PreferencesRequest) -> bool {
        request.update_by_admin.unwrap_or(false)
    }

    fn build_patch(&self, request: &PreferencesRequest, authorization: Authorization) -> RightsPatch {
        let mut patch = RightsPatch::new(&request.id);

        if authorization == Authorization::Admin {
            patch = patch
                .with(RightsField::IsStaff, request.is_staff)
                .with(RightsField::IsGardener, request.is_gardener)
                .with(RightsField::IsTrustedMember, request.is_trusted_member)
                .with(RightsField::IsVerified, request.is_verified);
        }

        patch
            .with(RightsField::IsPride, request.is_pride)
            .with(
                RightsField::HighSignalNotificationFilter,
                request.high_signal_notification_filter,
            )
    }

    fn apply_mode(&self) -> ApplyMode {
        ApplyMode::Upsert
    }

    fn invalidates_cache(&self, authorization: Authorization) -> bool {
        authorization == Authorization::Admin
    }
}
