use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use bookcart_core::Location;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::Instant;

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);
const TURN_LOCK_STRIPES: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State carried between turns of one conversation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<Location>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session: &SessionId) -> Result<Option<ConversationData>, SessionError>;
    async fn save(&self, session: &SessionId, data: ConversationData) -> Result<(), SessionError>;
    async fn clear(&self, session: &SessionId) -> Result<(), SessionError>;
    async fn len(&self) -> usize;
}

struct StoredSession {
    data: ConversationData,
    saved_at: Instant,
}

/// Process-local store. An entry not saved again within the idle timeout is
/// treated as abandoned: reads ignore it and the next save drops it.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
    idle_timeout: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE)
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), idle_timeout }
    }

    fn is_live(&self, entry: &StoredSession, now: Instant) -> bool {
        now.duration_since(entry.saved_at) < self.idle_timeout
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session: &SessionId) -> Result<Option<ConversationData>, SessionError> {
        let now = Instant::now();
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session)
            .filter(|entry| self.is_live(entry, now))
            .map(|entry| entry.data.clone()))
    }

    async fn save(&self, session: &SessionId, data: ConversationData) -> Result<(), SessionError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| self.is_live(entry, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(
                event_name = "actions.session.evicted",
                evicted,
                idle_secs = self.idle_timeout.as_secs(),
                "dropped idle sessions"
            );
        }

        sessions.insert(session.clone(), StoredSession { data, saved_at: now });
        Ok(())
    }

    async fn clear(&self, session: &SessionId) -> Result<(), SessionError> {
        self.sessions.write().await.remove(session);
        Ok(())
    }

    async fn len(&self) -> usize {
        let now = Instant::now();
        self.sessions.read().await.values().filter(|entry| self.is_live(entry, now)).count()
    }
}

/// Serializes turns of the same session from load to save.
///
/// Striped so the lock table stays a fixed size however many sessions exist;
/// two sessions sharing a stripe only wait on each other.
pub(crate) struct SessionLocks {
    stripes: Vec<Mutex<()>>,
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self { stripes: (0..TURN_LOCK_STRIPES).map(|_| Mutex::new(())).collect() }
    }
}

impl SessionLocks {
    pub(crate) async fn lock(&self, session: &SessionId) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        session.as_str().hash(&mut hasher);
        let stripe = (hasher.finish() % self.stripes.len() as u64) as usize;
        self.stripes[stripe].lock().await
    }
}
