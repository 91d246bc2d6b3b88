use serde::Deserialize;
use std::env;

/// Where learn data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// MongoDB for content/progress, Redis for sessions.
    Mongo,
    /// Process memory only; for local demos and tests.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthProviderConfig {
    /// Base URL of the hosted auth service.
    pub url: String,
    pub anon_key: String,
    pub service_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub redis_uri: String,
    pub mongo_database: String,
    /// Public origin of the web app, used to build redirects.
    pub site_url: String,
    pub auth: AuthProviderConfig,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub bind_addr: String,
    pub storage: StorageBackend,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from root .env file (two levels up)
        // Try root .env first, then fallback to local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let lookup = |key: &str, var: &str| settings.get_string(key).or_else(|_| env::var(var));

        let mongo_uri = lookup("database.mongo_uri", "MONGO_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let redis_uri = lookup("redis.uri", "REDIS_URI")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());

        let mongo_database = lookup("database.mongo_database", "MONGO_DATABASE")
            .unwrap_or_else(|_| "astrolearn".to_string());

        let site_url = lookup("site.url", "SITE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let auth_url = lookup("auth.url", "AUTH_URL")
            .map_err(|_| config::ConfigError::NotFound("auth.url (AUTH_URL)".into()))?;
        let anon_key = lookup("auth.anon_key", "AUTH_ANON_KEY")
            .map_err(|_| config::ConfigError::NotFound("auth.anon_key (AUTH_ANON_KEY)".into()))?;
        let service_key = lookup("auth.service_key", "AUTH_SERVICE_KEY").ok();

        let session_ttl_seconds = lookup("session.ttl_seconds", "SESSION_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(7 * 24 * 3600);

        let cookie_secure = lookup("cookie.secure", "COOKIE_SECURE")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(env == "prod");

        let bind_addr =
            lookup("server.bind_addr", "BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let storage = match lookup("storage.backend", "STORAGE_BACKEND")
            .unwrap_or_else(|_| "mongo".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "mongo" => StorageBackend::Mongo,
            other => {
                return Err(config::ConfigError::Message(format!(
                    "unknown storage backend: {}",
                    other
                )))
            }
        };

        Ok(Config {
            mongo_uri,
            redis_uri,
            mongo_database,
            site_url,
            auth: AuthProviderConfig {
                url: auth_url.trim_end_matches('/').to_string(),
                anon_key,
                service_key,
            },
            session_ttl_seconds,
            cookie_secure,
            bind_addr,
            storage,
        })
    }

    /// Configuration for tests and local demos; no external services needed.
    pub fn for_memory() -> Self {
        Config {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            redis_uri: "redis://127.0.0.1:6379/0".to_string(),
            mongo_database: "astrolearn_test".to_string(),
            site_url: "http://localhost:3000".to_string(),
            auth: AuthProviderConfig {
                url: "http://localhost:54321".to_string(),
                anon_key: "anon".to_string(),
                service_key: None,
            },
            session_ttl_seconds: 3600,
            cookie_secure: false,
            bind_addr: "127.0.0.1:0".to_string(),
            storage: StorageBackend::Memory,
        }
    }
}
