//! Short-lived per-user conversation checkpoints
//!
//! A session records where a multi-step interaction resumes and what it has
//! collected so far. Expiry is checked lazily on read; nothing sweeps in the
//! background.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Default lifetime of a stored session
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(120);

/// Checkpoint for one user
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub data: HashMap<String, String>,
    /// Route to resume at
    pub path: String,
    pub expires_at: Instant,
}

impl Session {
    /// Session that expires `ttl` from now
    pub fn new(path: impl Into<String>, data: HashMap<String, String>, ttl: Duration) -> Self {
        Self {
            data,
            path: path.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    /// Live sessions expire strictly after `now`
    pub fn is_live_at(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Storage for sessions, keyed by user identity
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `session`, replacing any existing entry for `key`
    async fn set(&self, key: &str, session: Session) -> Result<()>;

    /// Live session for `key`, if any
    async fn get(&self, key: &str) -> Option<Session>;

    /// Remove the entry for `key`. Missing entries are not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn set(&self, key: &str, session: Session) -> Result<()> {
        (**self).set(key, session).await
    }

    async fn get(&self, key: &str) -> Option<Session> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }
}

/// Process-memory session table behind a single reader/writer lock
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_live_at(now));
        before - sessions.len()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn set(&self, key: &str, session: Session) -> Result<()> {
        self.sessions.write().await.insert(key.to_string(), session);
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(key)
            .filter(|session| session.is_live_at(Instant::now()))
            .cloned()
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.sessions.write().await.remove(key);
        Ok(())
    }
}

/// Selectable session store implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionBackend {
    #[default]
    Memory,
}

impl SessionBackend {
    /// Parse a backend name. Unknown names are a configuration error.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "memory" | "cache" => Ok(Self::Memory),
            other => Err(Error::not_found(
                "session.backend",
                format!("unknown session backend {other:?}"),
            )),
        }
    }

    pub fn build(self) -> Arc<dyn SessionStore> {
        match self {
            Self::Memory => Arc::new(MemoryStore::new()),
        }
    }
}
