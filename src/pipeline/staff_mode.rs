use serde::Deserialize;

use super::{ApplyMode, Authorization, UpdatePolicy};
use crate::types::{MatchCondition, RightsField, RightsPatch};
use crate::validation::{FieldSpec, FieldType, Shape};

const SHAPE: Shape = Shape::new(&[
    FieldSpec::required("id", FieldType::String),
    FieldSpec::required("enabled", FieldType::Boolean),
]);

/// Body of `POST /updateStaffMode`
#[derive(Debug, Clone, Deserialize)]
pub struct StaffModeRequest {
    pub id: String,
    pub enabled: bool,
}

/// Toggle `staff_mode` on a profile the caller owns. Non-staff rows never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaffModePolicy;

impl UpdatePolicy for StaffModePolicy {
    type Request = StaffModeRequest;

    fn name(&self) -> &'static str {
        "preferences/updateStaffMode"
    }

    fn shape(&self) -> Shape {
        SHAPE
    }

    fn profile_id<'a>(&self, request: &'a StaffModeRequest) -> &'a str {
        &request.id
    }

    fn build_patch(&self, request: &StaffModeRequest, _authorization: Authorization) -> RightsPatch {
        RightsPatch::new(&request.id).with(RightsField::StaffMode, Some(request.enabled))
    }

    fn apply_mode(&self) -> ApplyMode {
        ApplyMode::UpdateWhere(vec![MatchCondition::eq(RightsField::IsStaff, true)])
    }
}
