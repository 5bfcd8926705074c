#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use preferences_api::api;
use preferences_api::auth::{
    sign_token, CallerIdentity, Claims, IdentityVerifier, JwtIdentityVerifier, OwnershipChecker,
    StaticAdminRegistry,
};
use preferences_api::cache::{CacheError, MemoryCache, PreferenceCache};
use preferences_api::config::AppConfig;
use preferences_api::database::{MemoryRightsStore, RightsStore, StoreError};
use preferences_api::pipeline::Collaborators;
use preferences_api::state::AppState;
use preferences_api::types::{MatchCondition, RightsPatch, RightsRecord};

pub const SECRET: &str = "integration-secret";
pub const VERIFIED_KEY: &str = "verified-list";

/// Configured admin, written checksummed
pub const ADMIN: &str = "0xAdA0000000000000000000000000000000000001";
/// Owns PROFILE
pub const OWNER: &str = "0x00000000000000000000000000000000000000b0";
/// Owns nothing
pub const STRANGER: &str = "0x00000000000000000000000000000000000000c0";

pub const PROFILE: &str = "0x01";
pub const OTHER_PROFILE: &str = "0x02";

pub fn token_for(address: &str) -> String {
    sign_token(&Claims::new(address, chrono::Duration::hours(1)), SECRET).expect("sign token")
}

pub fn expired_token_for(address: &str) -> String {
    sign_token(&Claims::new(address, chrono::Duration::hours(-2)), SECRET).expect("sign token")
}

pub fn forged_token_for(address: &str) -> String {
    sign_token(&Claims::new(address, chrono::Duration::hours(1)), "not-the-secret").expect("sign token")
}

pub struct CountingVerifier {
    inner: JwtIdentityVerifier,
    pub calls: AtomicUsize,
}

#[async_trait]
impl IdentityVerifier for CountingVerifier {
    async fn verify(&self, token: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(token).await
    }
}

pub struct CountingOwnership {
    owners: HashMap<String, Vec<String>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl OwnershipChecker for CountingOwnership {
    async fn owns(&self, caller: &CallerIdentity, profile_id: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.owners
            .get(&caller.address().to_ascii_lowercase())
            .map(|profiles| profiles.iter().any(|p| p == profile_id))
            .unwrap_or(false)
    }
}

pub struct CountingCache {
    inner: MemoryCache,
    fail_invalidation: bool,
    pub invalidations: AtomicUsize,
}

#[async_trait]
impl PreferenceCache for CountingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.inner.put(key, value, ttl).await
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        if self.fail_invalidation {
            return Err(CacheError::Backend {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.inner.invalidate(key).await
    }
}

/// Store that fails every call
pub struct BrokenStore;

#[async_trait]
impl RightsStore for BrokenStore {
    async fn fetch(&self, _id: &str) -> Result<Option<RightsRecord>, StoreError> {
        Err(StoreError::Query("connection reset".to_string()))
    }

    async fn upsert(&self, _patch: &RightsPatch) -> Result<RightsRecord, StoreError> {
        Err(StoreError::Query("connection reset".to_string()))
    }

    async fn update_where(
        &self,
        _patch: &RightsPatch,
        _conditions: &[MatchCondition],
    ) -> Result<RightsRecord, StoreError> {
        Err(StoreError::Query("connection reset".to_string()))
    }

    async fn verified_ids(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Query("connection reset".to_string()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Err(StoreError::Query("connection reset".to_string()))
    }
}

#[derive(Default)]
pub struct Options {
    pub fail_invalidation: bool,
    pub broken_store: bool,
}

/// In-process app wired to test doubles
pub struct Harness {
    pub app: Router,
    pub store: MemoryRightsStore,
    pub verifier: Arc<CountingVerifier>,
    pub ownership: Arc<CountingOwnership>,
    pub cache: Arc<CountingCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Options::default())
    }

    pub fn with(options: Options) -> Self {
        let store = MemoryRightsStore::new();
        let verifier = Arc::new(CountingVerifier {
            inner: JwtIdentityVerifier::new(SECRET),
            calls: AtomicUsize::new(0),
        });
        let ownership = Arc::new(CountingOwnership {
            owners: HashMap::from([(OWNER.to_ascii_lowercase(), vec![PROFILE.to_string()])]),
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(CountingCache {
            inner: MemoryCache::new(),
            fail_invalidation: options.fail_invalidation,
            invalidations: AtomicUsize::new(0),
        });

        let rights_store: Arc<dyn RightsStore> = if options.broken_store {
            Arc::new(BrokenStore)
        } else {
            Arc::new(store.clone())
        };

        let collaborators = Collaborators {
            verifier: verifier.clone(),
            ownership: ownership.clone(),
            admins: Arc::new(StaticAdminRegistry::new([ADMIN])),
            store: rights_store,
            cache: cache.clone(),
        };

        let state = AppState::new(collaborators, VERIFIED_KEY, Duration::from_secs(60));
        let app = api::app(state, &AppConfig::development());

        Self {
            app,
            store,
            verifier,
            ownership,
            cache,
        }
    }

    pub fn verifier_calls(&self) -> usize {
        self.verifier.calls.load(Ordering::SeqCst)
    }

    pub fn ownership_calls(&self) -> usize {
        self.ownership.calls.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.cache.invalidations.load(Ordering::SeqCst)
    }

    pub async fn seed(&self, record: RightsRecord) {
        self.store.insert(record).await;
    }

    pub async fn stored(&self, id: &str) -> Option<RightsRecord> {
        self.store.fetch(id).await.expect("memory store never fails")
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: &Value) -> (StatusCode, Value) {
        self.post_raw(path, token, body.to_string()).await
    }

    pub async fn post_raw(&self, path: &str, token: Option<&str>, body: impl Into<Body>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("X-Access-Token", token);
        }
        self.send(builder.body(body.into()).unwrap()).await
    }

    /// POST with an arbitrary, possibly non-text, access token header
    pub async fn post_with_header(&self, path: &str, token: HeaderValue, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .header("X-Access-Token", token)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(path).body(Body::empty()).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

pub fn staff(id: &str) -> RightsRecord {
    let mut record = RightsRecord::new(id);
    record.is_staff = true;
    record
}
