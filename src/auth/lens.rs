//! Lens API adapters for token verification and profile ownership.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use super::{CallerIdentity, IdentityVerifier, OwnershipChecker};

const VERIFY_QUERY: &str = "query Verify($request: VerifyRequest!) { verify(request: $request) }";

const PROFILES_QUERY: &str = "query Profiles($request: ProfileQueryRequest!) { \
                              profiles(request: $request) { items { id } } }";

/// Largest page the Lens API serves for one `profiles` query
const PROFILE_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Error)]
pub enum LensError {
    #[error("Lens request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Lens API returned errors: {0}")]
    GraphQl(String),

    #[error("Lens API response had no data")]
    MissingData,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Deserialize)]
struct VerifyData {
    verify: bool,
}

#[derive(Deserialize)]
struct ProfilesData {
    profiles: ProfilePage,
}

#[derive(Deserialize)]
struct ProfilePage {
    items: Vec<ProfileItem>,
}

#[derive(Deserialize)]
struct ProfileItem {
    id: String,
}

/// GraphQL client for the Lens API
#[derive(Clone)]
pub struct LensClient {
    client: Client,
    endpoint: String,
}

impl LensClient {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Client with its own connection pool and request timeout
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, LensError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("preferences-api/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(client, endpoint))
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, LensError> {
        let response: GraphQlResponse<T> = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.errors.is_empty() {
            return Err(LensError::GraphQl(Value::Array(response.errors).to_string()));
        }
        response.data.ok_or(LensError::MissingData)
    }

    /// Ask the token authority whether `token` is currently valid
    pub async fn verify_token(&self, token: &str) -> Result<bool, LensError> {
        let data: VerifyData = self
            .query(VERIFY_QUERY, json!({ "request": { "accessToken": token } }))
            .await?;
        Ok(data.verify)
    }

    /// Profile ids currently owned by `address`
    pub async fn owned_profiles(&self, address: &str) -> Result<Vec<String>, LensError> {
        let data: ProfilesData = self
            .query(
                PROFILES_QUERY,
                json!({ "request": { "ownedBy": [address], "limit": PROFILE_PAGE_LIMIT } }),
            )
            .await?;
        Ok(data.profiles.items.into_iter().map(|p| p.id).collect())
    }
}

/// A token that cannot be verified is treated as invalid.
#[async_trait]
impl IdentityVerifier for LensClient {
    async fn verify(&self, token: &str) -> bool {
        match self.verify_token(token).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Access token verification failed: {}", e);
                false
            }
        }
    }
}

/// Profile ids are hex, so comparison ignores case. Lookup failures deny.
#[async_trait]
impl OwnershipChecker for LensClient {
    async fn owns(&self, caller: &CallerIdentity, profile_id: &str) -> bool {
        match self.owned_profiles(caller.address()).await {
            Ok(ids) => ids.iter().any(|id| id.eq_ignore_ascii_case(profile_id)),
            Err(e) => {
                warn!("Ownership lookup for {} failed: {}", caller, e);
                false
            }
        }
    }
}
