//! Server-side browser sessions.
//!
//! The cookie only carries an opaque id; the identity lives in the store
//! and expires with it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::metrics::track_session_operation;
use crate::models::{AuthSession, AuthUser};

pub const SESSION_COOKIE: &str = "session_id";

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session store error: {0}")]
    Backend(String),
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for SessionStoreError {
    fn from(err: redis::RedisError) -> Self {
        SessionStoreError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, user: AuthUser) -> Result<AuthSession, SessionStoreError>;
    /// `None` for unknown or expired ids.
    async fn get(&self, session_id: &str) -> Result<Option<AuthSession>, SessionStoreError>;
    async fn revoke(&self, session_id: &str) -> Result<(), SessionStoreError>;
    async fn ping(&self) -> Result<(), SessionStoreError>;
}

fn new_session(user: AuthUser, ttl_seconds: u64) -> AuthSession {
    let now = Utc::now();
    AuthSession {
        id: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
        user,
        created_at: now,
        expires_at: now + Duration::seconds(ttl_seconds as i64),
    }
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

pub struct RedisSessionStore {
    redis: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub fn new(redis: ConnectionManager, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, user: AuthUser) -> Result<AuthSession, SessionStoreError> {
        let session = new_session(user, self.ttl_seconds);
        let session_json = serde_json::to_string(&session)?;
        let mut conn = self.redis.clone();

        track_session_operation("setex", async {
            redis::cmd("SETEX")
                .arg(session_key(&session.id))
                .arg(self.ttl_seconds)
                .arg(session_json)
                .query_async::<()>(&mut conn)
                .await
        })
        .await?;

        tracing::info!("Session created for user: {}", session.user.id);
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Option<AuthSession>, SessionStoreError> {
        let mut conn = self.redis.clone();
        let session_json = track_session_operation("get", async {
            redis::cmd("GET")
                .arg(session_key(session_id))
                .query_async::<Option<String>>(&mut conn)
                .await
        })
        .await?;

        match session_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn revoke(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.redis.clone();
        track_session_operation("del", async {
            redis::cmd("DEL")
                .arg(session_key(session_id))
                .query_async::<()>(&mut conn)
                .await
        })
        .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), SessionStoreError> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

/// Process-local store used with the in-memory storage backend and in tests.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, AuthSession>>>,
    ttl_seconds: u64,
}

impl MemorySessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl_seconds,
        }
    }

    /// Stores a ready-made session, e.g. one that is already expired.
    pub async fn insert(&self, session: AuthSession) {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user: AuthUser) -> Result<AuthSession, SessionStoreError> {
        let session = new_session(user, self.ttl_seconds);
        self.insert(session.clone()).await;
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Option<AuthSession>, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Ok(Some(session.clone())),
            Some(_) => {
                sessions.remove(session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn revoke(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), SessionStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            id: "user-1".into(),
            email: Some("ada@example.com".into()),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn created_session_can_be_read_and_revoked() {
        let store = MemorySessionStore::new(60);
        let session = store.create(user()).await.unwrap();
        assert_eq!(session.id.len(), 64);

        let found = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(found.user, user());

        store.revoke(&session.id).await.unwrap();
        assert!(store.get(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_not_returned() {
        let store = MemorySessionStore::new(60);
        let mut session = new_session(user(), 60);
        session.expires_at = Utc::now() - Duration::seconds(1);
        store.insert(session.clone()).await;

        assert!(store.get(&session.id).await.unwrap().is_none());
    }

    #[test]
    fn session_ids_are_unique() {
        let a = new_session(user(), 60);
        let b = new_session(user(), 60);
        assert_ne!(a.id, b.id);
        assert_eq!(session_key("abc"), "session:abc");
    }
}
