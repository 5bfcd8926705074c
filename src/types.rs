/// Shared types used across the codebase

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Boolean columns of the `rights` table that a request may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RightsField {
    IsStaff,
    IsGardener,
    IsTrustedMember,
    IsVerified,
    IsPride,
    HighSignalNotificationFilter,
    StaffMode,
}

impl RightsField {
    /// Fields only an administrator may set
    pub const PRIVILEGED: [RightsField; 4] = [
        RightsField::IsStaff,
        RightsField::IsGardener,
        RightsField::IsTrustedMember,
        RightsField::IsVerified,
    ];

    /// Fields any authorized writer may set through the preferences route
    pub const UNIVERSAL: [RightsField; 2] = [
        RightsField::IsPride,
        RightsField::HighSignalNotificationFilter,
    ];

    /// Column name in the `rights` table
    pub fn column(&self) -> &'static str {
        match self {
            RightsField::IsStaff => "is_staff",
            RightsField::IsGardener => "is_gardener",
            RightsField::IsTrustedMember => "is_trusted_member",
            RightsField::IsVerified => "is_verified",
            RightsField::IsPride => "is_pride",
            RightsField::HighSignalNotificationFilter => "high_signal_notification_filter",
            RightsField::StaffMode => "staff_mode",
        }
    }

    /// Key used in request bodies
    pub fn request_key(&self) -> &'static str {
        match self {
            RightsField::IsStaff => "isStaff",
            RightsField::IsGardener => "isGardener",
            RightsField::IsTrustedMember => "isTrustedMember",
            RightsField::IsVerified => "isVerified",
            RightsField::IsPride => "isPride",
            RightsField::HighSignalNotificationFilter => "highSignalNotificationFilter",
            RightsField::StaffMode => "enabled",
        }
    }

    pub fn is_privileged(&self) -> bool {
        Self::PRIVILEGED.contains(self)
    }
}

/// Persisted rights row for one profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RightsRecord {
    pub id: String,
    pub is_staff: bool,
    pub is_gardener: bool,
    pub is_trusted_member: bool,
    pub is_verified: bool,
    pub is_pride: bool,
    pub high_signal_notification_filter: bool,
    pub staff_mode: bool,
}

impl RightsRecord {
    /// Row as created when nothing but the id is known
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_staff: false,
            is_gardener: false,
            is_trusted_member: false,
            is_verified: false,
            is_pride: false,
            high_signal_notification_filter: false,
            staff_mode: false,
        }
    }

    pub fn get(&self, field: RightsField) -> bool {
        match field {
            RightsField::IsStaff => self.is_staff,
            RightsField::IsGardener => self.is_gardener,
            RightsField::IsTrustedMember => self.is_trusted_member,
            RightsField::IsVerified => self.is_verified,
            RightsField::IsPride => self.is_pride,
            RightsField::HighSignalNotificationFilter => self.high_signal_notification_filter,
            RightsField::StaffMode => self.staff_mode,
        }
    }

    pub fn set(&mut self, field: RightsField, value: bool) {
        match field {
            RightsField::IsStaff => self.is_staff = value,
            RightsField::IsGardener => self.is_gardener = value,
            RightsField::IsTrustedMember => self.is_trusted_member = value,
            RightsField::IsVerified => self.is_verified = value,
            RightsField::IsPride => self.is_pride = value,
            RightsField::HighSignalNotificationFilter => self.high_signal_notification_filter = value,
            RightsField::StaffMode => self.staff_mode = value,
        }
    }

    /// Apply every present field of a patch; absent fields keep their value
    pub fn merge(&mut self, patch: &RightsPatch) {
        for (field, value) in &patch.fields {
            self.set(*field, *value);
        }
    }
}

/// Storage key for a profile id. Profile ids are hex, so case is not significant.
pub fn profile_key(id: &str) -> String {
    id.to_ascii_lowercase()
}

/// Partial update keyed by profile id.
///
/// A field missing from `fields` is left untouched in storage. This is
/// distinct from a field present with `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RightsPatch {
    pub id: String,
    pub fields: BTreeMap<RightsField, bool>,
}

impl RightsPatch {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: profile_key(id.as_ref()),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field only when a value was supplied
    pub fn with(mut self, field: RightsField, value: Option<bool>) -> Self {
        if let Some(value) = value {
            self.fields.insert(field, value);
        }
        self
    }

    pub fn get(&self, field: RightsField) -> Option<bool> {
        self.fields.get(&field).copied()
    }

    pub fn touches_privileged(&self) -> bool {
        self.fields.keys().any(RightsField::is_privileged)
    }
}

/// Equality constraint a conditional update must satisfy on the stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCondition {
    pub field: RightsField,
    pub value: bool,
}

impl MatchCondition {
    pub fn eq(field: RightsField, value: bool) -> Self {
        Self { field, value }
    }

    pub fn matches(&self, record: &RightsRecord) -> bool {
        record.get(self.field) == self.value
    }
}
