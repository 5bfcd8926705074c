use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::PreferenceCache;
use crate::database::{RightsStore, StoreError};
use crate::types::{profile_key, RightsRecord};

#[derive(Debug, Error)]
pub enum RightsServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read side of the rights table
pub struct RightsService {
    store: Arc<dyn RightsStore>,
    cache: Arc<dyn PreferenceCache>,
    verified_key: String,
    ttl: Duration,
}

impl RightsService {
    pub fn new(
        store: Arc<dyn RightsStore>,
        cache: Arc<dyn PreferenceCache>,
        verified_key: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            verified_key: verified_key.into(),
            ttl,
        }
    }

    /// Stored rights for a profile, or an all-false record when none exists yet
    pub async fn get(&self, id: &str) -> Result<RightsRecord, RightsServiceError> {
        let id = profile_key(id);
        Ok(self
            .store
            .fetch(&id)
            .await?
            .unwrap_or_else(|| RightsRecord::new(id)))
    }

    /// Verified profile ids, read through the cache.
    ///
    /// Cache failures fall back to the store and never fail the call.
    pub async fn verified_ids(&self) -> Result<Vec<String>, RightsServiceError> {
        match self.cache.get(&self.verified_key).await {
            Ok(Some(cached)) => match serde_json::from_str::<Vec<String>>(&cached) {
                Ok(ids) => {
                    debug!("verified list served from cache");
                    return Ok(ids);
                }
                Err(e) => warn!("discarding unreadable cache entry {}: {}", self.verified_key, e),
            },
            Ok(None) => {}
            Err(e) => warn!("cache read for {} failed: {}", self.verified_key, e),
        }

        let ids = self.store.verified_ids().await?;

        match serde_json::to_string(&ids) {
            Ok(encoded) => {
                if let Err(e) = self.cache.put(&self.verified_key, &encoded, self.ttl).await {
                    warn!("cache write for {} failed: {}", self.verified_key, e);
                }
            }
            Err(e) => warn!("failed to encode verified list: {}", e),
        }

        Ok(ids)
    }

    pub async fn health_check(&self) -> Result<(), RightsServiceError> {
        Ok(self.store.health_check().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::database::MemoryRightsStore;

    fn service(store: &MemoryRightsStore, cache: &MemoryCache) -> RightsService {
        RightsService::new(
            Arc::new(store.clone()),
            Arc::new(cache.clone()),
            "verified-list",
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn missing_profiles_read_as_defaults() {
        let store = MemoryRightsStore::new();
        let rights = service(&store, &MemoryCache::new()).get("0x09").await.unwrap();
        assert_eq!(rights, RightsRecord::new("0x09"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn reads_ignore_id_case() {
        let store = MemoryRightsStore::new();
        let mut record = RightsRecord::new("0x0a");
        record.is_pride = true;
        store.insert(record.clone()).await;

        let rights = service(&store, &MemoryCache::new()).get("0x0A").await.unwrap();
        assert_eq!(rights, record);
    }

    #[tokio::test]
    async fn verified_list_is_cached_until_invalidated() {
        let store = MemoryRightsStore::new();
        let cache = MemoryCache::new();
        let service = service(&store, &cache);

        let mut verified = RightsRecord::new("0x01");
        verified.is_verified = true;
        store.insert(verified).await;
        assert_eq!(service.verified_ids().await.unwrap(), vec!["0x01"]);

        let mut later = RightsRecord::new("0x02");
        later.is_verified = true;
        store.insert(later).await;
        assert_eq!(service.verified_ids().await.unwrap(), vec!["0x01"]);

        cache.invalidate("verified-list").await.unwrap();
        assert_eq!(service.verified_ids().await.unwrap(), vec!["0x01", "0x02"]);
    }

    #[tokio::test]
    async fn unreadable_cache_entries_fall_back_to_store() {
        let store = MemoryRightsStore::new();
        let cache = MemoryCache::new();
        cache.put("verified-list", "not json", Duration::from_secs(60)).await.unwrap();

        let ids = service(&store, &cache).verified_ids().await.unwrap();
        assert!(ids.is_empty());
        assert_eq!(cache.get("verified-list").await.unwrap().as_deref(), Some("[]"));
    }
}
