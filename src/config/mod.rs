use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size_bytes: usize,
    pub store: StoreBackend,
}

/// Where rights records live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Addresses allowed to update privileged rights
    pub admin_addresses: Vec<String>,
    /// When set, access tokens are verified locally as HS256 JWTs instead of asking the Lens API
    pub jwt_secret: Option<String>,
    pub lens_api_url: String,
    pub lens_timeout_secs: u64,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Kv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Key holding the cached verified-profile list
    pub verified_key: String,
    pub ttl_secs: u64,
    pub kv_api_url: String,
    pub kv_account_id: Option<String>,
    pub kv_namespace_id: Option<String>,
    pub kv_api_token: Option<String>,
}

pub const DEFAULT_VERIFIED_KEY: &str = "verified-list";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PREFERENCES_API_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }
        if let Ok(v) = env::var("PREFERENCES_STORE") {
            self.server.store = v.parse().unwrap_or(self.server.store);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("ADMIN_ADDRESSES") {
            self.security.admin_addresses = split_list(&v);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("LENS_API_URL") {
            self.security.lens_api_url = v;
        }
        if let Ok(v) = env::var("LENS_TIMEOUT_SECS") {
            self.security.lens_timeout_secs = v.parse().unwrap_or(self.security.lens_timeout_secs);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }

        // Cache overrides
        if let Ok(v) = env::var("CACHE_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "kv" => self.cache.backend = CacheBackend::Kv,
                "memory" => self.cache.backend = CacheBackend::Memory,
                _ => {}
            }
        }
        if let Ok(v) = env::var("VERIFIED_KV_KEY") {
            self.cache.verified_key = v;
        }
        if let Ok(v) = env::var("CACHE_TTL_SECS") {
            self.cache.ttl_secs = v.parse().unwrap_or(self.cache.ttl_secs);
        }
        if let Ok(v) = env::var("CLOUDFLARE_API_URL") {
            self.cache.kv_api_url = v;
        }
        if let Ok(v) = env::var("CLOUDFLARE_ACCOUNT_ID") {
            self.cache.kv_account_id = Some(v);
        }
        if let Ok(v) = env::var("PREFERENCES_KV_NAMESPACE_ID") {
            self.cache.kv_namespace_id = Some(v);
        }
        if let Ok(v) = env::var("CLOUDFLARE_API_TOKEN") {
            self.cache.kv_api_token = Some(v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8083,
                max_request_size_bytes: 64 * 1024,
                store: StoreBackend::Memory,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                admin_addresses: Vec::new(),
                jwt_secret: None,
                lens_api_url: "https://api-mumbai.lens.dev".to_string(),
                lens_timeout_secs: 10,
                enable_cors: true,
            },
            cache: CacheConfig {
                backend: CacheBackend::Memory,
                verified_key: DEFAULT_VERIFIED_KEY.to_string(),
                ttl_secs: 60,
                kv_api_url: "https://api.cloudflare.com/client/v4".to_string(),
                kv_account_id: None,
                kv_namespace_id: None,
                kv_api_token: None,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8083,
                max_request_size_bytes: 16 * 1024,
                store: StoreBackend::Postgres,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                admin_addresses: Vec::new(),
                jwt_secret: None,
                lens_api_url: "https://api-mumbai.lens.dev".to_string(),
                lens_timeout_secs: 5,
                enable_cors: true,
            },
            cache: CacheConfig {
                backend: CacheBackend::Kv,
                verified_key: DEFAULT_VERIFIED_KEY.to_string(),
                ttl_secs: 300,
                kv_api_url: "https://api.cloudflare.com/client/v4".to_string(),
                kv_account_id: None,
                kv_namespace_id: None,
                kv_api_token: None,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8083,
                max_request_size_bytes: 16 * 1024,
                store: StoreBackend::Postgres,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                admin_addresses: Vec::new(),
                jwt_secret: None,
                lens_api_url: "https://api.lens.dev".to_string(),
                lens_timeout_secs: 5,
                enable_cors: true,
            },
            cache: CacheConfig {
                backend: CacheBackend::Kv,
                verified_key: DEFAULT_VERIFIED_KEY.to_string(),
                ttl_secs: 3600,
                kv_api_url: "https://api.cloudflare.com/client/v4".to_string(),
                kv_account_id: None,
                kv_namespace_id: None,
                kv_api_token: None,
            },
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
