pub mod kv;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

pub use kv::KvCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Cache request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Cache backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Invalid cache URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Key/value cache sitting in front of downstream lookups.
///
/// Failures are never fatal to the caller; a stale entry is degraded but safe.
#[async_trait]
pub trait PreferenceCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

struct Entry {
    value: String,
    /// `None` when the ttl is too large to represent
    expires_at: Option<Instant>,
}

/// In-process cache for development and tests
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at.map_or(true, |at| at > Instant::now()))
            .map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
