use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::{IdentityVerifier, JwtIdentityVerifier, LensClient, StaticAdminRegistry};
use crate::cache::{KvCache, MemoryCache, PreferenceCache};
use crate::config::{AppConfig, CacheBackend, StoreBackend};
use crate::database::{DatabaseManager, MemoryRightsStore, PgRightsStore, RightsStore};
use crate::pipeline::{AuthorizationPipeline, Collaborators};
use crate::services::RightsService;

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AuthorizationPipeline>,
    pub rights: Arc<RightsService>,
}

impl AppState {
    /// Wire the pipeline and read service over one set of collaborators
    pub fn new(collaborators: Collaborators, verified_key: &str, cache_ttl: Duration) -> Self {
        let rights = RightsService::new(
            collaborators.store.clone(),
            collaborators.cache.clone(),
            verified_key,
            cache_ttl,
        );
        Self {
            pipeline: Arc::new(AuthorizationPipeline::new(collaborators, verified_key)),
            rights: Arc::new(rights),
        }
    }

    /// Build production collaborators from configuration
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let lens = LensClient::with_timeout(
            config.security.lens_api_url.clone(),
            Duration::from_secs(config.security.lens_timeout_secs),
        )
        .context("failed to build Lens API client")?;

        let verifier: Arc<dyn IdentityVerifier> = match &config.security.jwt_secret {
            Some(secret) => {
                info!("Verifying access tokens locally (HS256)");
                Arc::new(JwtIdentityVerifier::new(secret))
            }
            None => {
                info!("Verifying access tokens against {}", config.security.lens_api_url);
                Arc::new(lens.clone())
            }
        };

        let admins = StaticAdminRegistry::new(&config.security.admin_addresses);
        if admins.is_empty() {
            warn!("No administrator addresses configured; admin updates will be refused");
        }

        let store: Arc<dyn RightsStore> = match config.server.store {
            StoreBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database)
                    .await
                    .context("failed to connect to rights database")?;
                let store = PgRightsStore::new(pool);
                store.ensure_schema().await.context("failed to prepare rights table")?;
                Arc::new(store)
            }
            StoreBackend::Memory => {
                warn!("Using in-memory rights store; data is lost on restart");
                Arc::new(MemoryRightsStore::new())
            }
        };

        let cache: Arc<dyn PreferenceCache> = match config.cache.backend {
            CacheBackend::Kv => Arc::new(
                KvCache::new(reqwest::Client::new(), &config.cache).context("failed to configure KV cache")?,
            ),
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
        };

        let collaborators = Collaborators {
            verifier,
            ownership: Arc::new(lens),
            admins: Arc::new(admins),
            store,
            cache,
        };

        Ok(Self::new(
            collaborators,
            &config.cache.verified_key,
            Duration::from_secs(config.cache.ttl_secs),
        ))
    }
}
