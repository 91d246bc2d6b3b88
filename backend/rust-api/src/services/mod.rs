use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::repository::{InMemoryLearnRepository, LearnRepository, MongoLearnRepository};
use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager;

use auth_service::{AuthGateway, HttpAuthGateway};
use session_service::{MemorySessionStore, RedisSessionStore, SessionStore};

pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn LearnRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub auth: Arc<dyn AuthGateway>,
}

impl AppState {
    pub fn new(
        config: Config,
        repository: Arc<dyn LearnRepository>,
        sessions: Arc<dyn SessionStore>,
        auth: Arc<dyn AuthGateway>,
    ) -> Self {
        Self {
            config,
            repository,
            sessions,
            auth,
        }
    }

    /// Builds the production clients for the configured storage backend.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let auth: Arc<dyn AuthGateway> = Arc::new(HttpAuthGateway::new(&config.auth)?);

        let (repository, sessions): (Arc<dyn LearnRepository>, Arc<dyn SessionStore>) =
            match config.storage {
                StorageBackend::Memory => {
                    tracing::warn!("Using in-memory storage; data is lost on restart");
                    (
                        Arc::new(InMemoryLearnRepository::new()),
                        Arc::new(MemorySessionStore::new(config.session_ttl_seconds)),
                    )
                }
                StorageBackend::Mongo => {
                    let mongo_client = MongoClient::with_uri_str(&config.mongo_uri).await?;
                    let mongo = mongo_client.database(&config.mongo_database);
                    let repository = MongoLearnRepository::new(mongo);
                    repository.ensure_indexes().await?;
                    tracing::info!("MongoDB connected, indexes ensured");

                    let redis = connect_redis(&config.redis_uri).await?;
                    (
                        Arc::new(repository),
                        Arc::new(RedisSessionStore::new(redis, config.session_ttl_seconds)),
                    )
                }
            };

        Ok(Self::new(config, repository, sessions, auth))
    }
}

async fn connect_redis(redis_uri: &str) -> anyhow::Result<ConnectionManager> {
    let redis_client = redis::Client::open(redis_uri)?;

    tracing::info!("Attempting to connect to Redis...");

    let redis = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        ConnectionManager::new(redis_client),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

    tracing::info!("Redis ConnectionManager created, testing with PING...");

    let mut conn = redis.clone();
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        redis::cmd("PING").query_async::<String>(&mut conn),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

    tracing::info!("Redis connection established successfully");
    Ok(redis)
}

pub mod auth_service;
pub mod catalog_service;
pub mod profile_service;
pub mod progress_service;
pub mod session_service;
