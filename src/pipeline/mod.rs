//! Authorization-gated selective update of rights records.
//!
//! Both update routes run the same sequence:
//!
//! ```text
//! body -> shape -> token present -> token verified -> subject extracted
//!      -> admin | owner decision -> patch -> single store call -> [cache delete]
//! ```
//!
//! The first unmet precondition ends the request. What differs per route
//! (shape, whether an admin override exists, which fields are written, how the
//! store is matched, whether the cache is touched) lives in an [`UpdatePolicy`].

pub mod preferences;
pub mod staff_mode;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::auth::{extract_subject, AdminRegistry, CallerIdentity, IdentityVerifier, OwnershipChecker};
use crate::cache::PreferenceCache;
use crate::database::RightsStore;
use crate::error::PreferencesError;
use crate::types::{MatchCondition, RightsPatch, RightsRecord};
use crate::validation::{read_body, Body, Shape};

pub use preferences::{PreferencesPolicy, PreferencesRequest};
pub use staff_mode::{StaffModePolicy, StaffModeRequest};

/// Which branch granted access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Admin,
    SelfOwner,
}

/// How a patch reaches the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyMode {
    /// Create the row if missing
    Upsert,
    /// Update an existing row only when every condition holds
    UpdateWhere(Vec<MatchCondition>),
}

/// Per-route strategy plugged into [`AuthorizationPipeline`]
pub trait UpdatePolicy: Send + Sync {
    type Request: DeserializeOwned + Send + Sync;

    /// Operation name used for the tracing span
    fn name(&self) -> &'static str;

    fn shape(&self) -> Shape;

    fn profile_id<'a>(&self, request: &'a Self::Request) -> &'a str;

    /// True when the request asks for the admin override instead of an ownership check
    fn admin_requested(&self, _request: &Self::Request) -> bool {
        false
    }

    fn build_patch(&self, request: &Self::Request, authorization: Authorization) -> RightsPatch;

    fn apply_mode(&self) -> ApplyMode;

    fn invalidates_cache(&self, _authorization: Authorization) -> bool {
        false
    }
}

/// External services the pipeline depends on
#[derive(Clone)]
pub struct Collaborators {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub ownership: Arc<dyn OwnershipChecker>,
    pub admins: Arc<dyn AdminRegistry>,
    pub store: Arc<dyn RightsStore>,
    pub cache: Arc<dyn PreferenceCache>,
}

pub struct AuthorizationPipeline {
    collaborators: Collaborators,
    /// Cache key gating downstream verified-status lookups
    verified_key: String,
}

impl AuthorizationPipeline {
    pub fn new(collaborators: Collaborators, verified_key: impl Into<String>) -> Self {
        Self {
            collaborators,
            verified_key: verified_key.into(),
        }
    }

    /// Run one request through the pipeline. Each call is a single attempt.
    pub async fn run<P: UpdatePolicy>(
        &self,
        policy: &P,
        raw_body: &[u8],
        access_token: Option<&str>,
    ) -> Result<RightsRecord, PreferencesError> {
        let span = info_span!(
            "preferences",
            operation = policy.name(),
            request_id = %Uuid::new_v4(),
        );

        let result = self.execute(policy, raw_body, access_token).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| debug!("request rejected: {}", e.error_code()));
        }
        result
    }

    async fn execute<P: UpdatePolicy>(
        &self,
        policy: &P,
        raw_body: &[u8],
        access_token: Option<&str>,
    ) -> Result<RightsRecord, PreferencesError> {
        let body = match read_body(raw_body) {
            Body::Missing => return Err(PreferencesError::NoBody),
            Body::Malformed(issue) => return Err(PreferencesError::ValidationError(vec![issue])),
            Body::Json(value) => value,
        };

        let request: P::Request = policy
            .shape()
            .parse(&body)
            .map_err(PreferencesError::ValidationError)?;

        let token = access_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(PreferencesError::NoAccessToken)?;

        let caller = self.authenticate(token).await?;
        let profile_id = policy.profile_id(&request);
        let authorization = self.authorize(policy, &request, &caller, profile_id).await?;

        let mut patch = policy.build_patch(&request, authorization);
        if authorization != Authorization::Admin {
            patch.fields.retain(|field, _| !field.is_privileged());
        }

        let record = self.apply(policy.apply_mode(), &patch).await?;
        info!(
            "rights for {} updated by {} ({:?}, {} fields)",
            record.id,
            caller,
            authorization,
            patch.fields.len()
        );

        if policy.invalidates_cache(authorization) {
            self.invalidate_verified().await;
        }

        Ok(record)
    }

    /// Verify the token, then read its subject. Never the other way round.
    async fn authenticate(&self, token: &str) -> Result<CallerIdentity, PreferencesError> {
        if !self.collaborators.verifier.verify(token).await {
            return Err(PreferencesError::InvalidAccessToken);
        }

        extract_subject(token).ok_or_else(|| {
            warn!("verified access token carried no subject");
            PreferencesError::InvalidAccessToken
        })
    }

    async fn authorize<P: UpdatePolicy>(
        &self,
        policy: &P,
        request: &P::Request,
        caller: &CallerIdentity,
        profile_id: &str,
    ) -> Result<Authorization, PreferencesError> {
        if policy.admin_requested(request) {
            if !self.collaborators.admins.is_admin(caller) {
                warn!("{} requested an admin update without admin rights", caller);
                return Err(PreferencesError::NotAdmin);
            }
            return Ok(Authorization::Admin);
        }

        if !self.collaborators.ownership.owns(caller, profile_id).await {
            debug!("{} does not own profile {}", caller, profile_id);
            return Err(PreferencesError::InvalidProfileId);
        }
        Ok(Authorization::SelfOwner)
    }

    async fn apply(&self, mode: ApplyMode, patch: &RightsPatch) -> Result<RightsRecord, PreferencesError> {
        let store = &self.collaborators.store;
        let result = match &mode {
            ApplyMode::Upsert => store.upsert(patch).await,
            ApplyMode::UpdateWhere(conditions) => store.update_where(patch, conditions).await,
        };

        result.map_err(|e| {
            error!("rights mutation for {} failed ({:?}): {}", patch.id, mode, e);
            PreferencesError::Persistence(e)
        })
    }

    /// Failures are logged and never fail the update.
    async fn invalidate_verified(&self) {
        match self.collaborators.cache.invalidate(&self.verified_key).await {
            Ok(()) => debug!("invalidated cache key {}", self.verified_key),
            Err(e) => error!("failed to invalidate cache key {}: {}", self.verified_key, e),
        }
    }
}
