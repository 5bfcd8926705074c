use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use super::{CacheError, PreferenceCache};
use crate::config::CacheConfig;

/// Cloudflare KV has a floor on expiration TTLs
const MIN_KV_TTL_SECS: u64 = 60;

/// Cache backed by a Cloudflare Workers KV namespace through the REST API
pub struct KvCache {
    client: Client,
    values_url: Url,
    api_token: String,
}

impl KvCache {
    pub fn new(client: Client, config: &CacheConfig) -> Result<Self, CacheError> {
        let account = config
            .kv_account_id
            .as_deref()
            .ok_or(CacheError::NotConfigured("CLOUDFLARE_ACCOUNT_ID"))?;
        let namespace = config
            .kv_namespace_id
            .as_deref()
            .ok_or(CacheError::NotConfigured("PREFERENCES_KV_NAMESPACE_ID"))?;
        let api_token = config
            .kv_api_token
            .clone()
            .ok_or(CacheError::NotConfigured("CLOUDFLARE_API_TOKEN"))?;

        let base = config.kv_api_url.trim_end_matches('/');
        let values_url = Url::parse(&format!(
            "{base}/accounts/{account}/storage/kv/namespaces/{namespace}/values/"
        ))?;

        Ok(Self {
            client,
            values_url,
            api_token,
        })
    }

    fn key_url(&self, key: &str) -> Result<Url, CacheError> {
        let mut url = self.values_url.clone();
        url.path_segments_mut()
            .map_err(|_| CacheError::NotConfigured("kv_api_url"))?
            .pop_if_empty()
            .push(key);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CacheError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(CacheError::Backend { status, body })
    }
}

#[async_trait]
impl PreferenceCache for KvCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let response = self
            .client
            .get(self.key_url(key)?)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response).await?;
        Ok(Some(response.text().await?))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut url = self.key_url(key)?;
        let ttl = ttl.as_secs().max(MIN_KV_TTL_SECS);
        url.query_pairs_mut()
            .append_pair("expiration_ttl", &ttl.to_string());

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.api_token)
            .body(value.to_string())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let response = self
            .client
            .delete(self.key_url(key)?)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        // Deleting an absent key is already the desired state
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheBackend, DEFAULT_VERIFIED_KEY};

    fn config() -> CacheConfig {
        CacheConfig {
            backend: CacheBackend::Kv,
            verified_key: DEFAULT_VERIFIED_KEY.to_string(),
            ttl_secs: 60,
            kv_api_url: "https://api.cloudflare.com/client/v4/".to_string(),
            kv_account_id: Some("acct".to_string()),
            kv_namespace_id: Some("ns".to_string()),
            kv_api_token: Some("token".to_string()),
        }
    }

    #[test]
    fn builds_value_urls() {
        let cache = KvCache::new(Client::new(), &config()).unwrap();
        let url = cache.key_url("verified-list").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.cloudflare.com/client/v4/accounts/acct/storage/kv/namespaces/ns/values/verified-list"
        );
    }

    #[test]
    fn escapes_keys() {
        let cache = KvCache::new(Client::new(), &config()).unwrap();
        let url = cache.key_url("a/b c").unwrap();
        assert!(url.as_str().ends_with("/values/a%2Fb%20c"));
    }

    #[test]
    fn requires_credentials() {
        let mut config = config();
        config.kv_api_token = None;
        assert!(matches!(
            KvCache::new(Client::new(), &config),
            Err(CacheError::NotConfigured("CLOUDFLARE_API_TOKEN"))
        ));
    }
}
