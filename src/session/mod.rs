//! TTL-bounded key/value sessions used to carry identity and error context
//! across redirects.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use ulid::Ulid;

/// Immutable snapshot of a stored session.
///
/// Writes go through [`SessionStore::put`]; the snapshot never mutates the
/// store behind the caller's back.
#[derive(Clone, Debug)]
pub struct Session {
    key: String,
    values: HashMap<String, String>,
}

impl Session {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read a field, falling back to `default` when it was never set.
    #[must_use]
    pub fn get_or_default(&self, field: &str, default: &str) -> String {
        self.values
            .get(field)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Session persistence with expiry. A missing or expired session reads as
/// "not found", never as an error.
pub trait SessionStore: Send + Sync {
    /// Look up a session by key. `None` when unknown or past its TTL.
    fn get(&self, key: &str) -> Option<Session>;

    /// Create an empty session with a fresh opaque key and the given TTL.
    fn create(&self, ttl: Duration) -> Session;

    /// Set a field on an existing session. Writes to unknown or expired
    /// sessions are dropped.
    fn put(&self, key: &str, field: &str, value: &str);
}

struct StoredSession {
    values: HashMap<String, String>,
    created_at: Instant,
    ttl: Duration,
}

impl StoredSession {
    fn expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// In-memory [`SessionStore`]. Expired entries are purged on creation and
/// ignored on read, so expiry needs no background task.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<Session> {
        let sessions = self.lock();
        let stored = sessions.get(key).filter(|stored| !stored.expired())?;
        Some(Session {
            key: key.to_string(),
            values: stored.values.clone(),
        })
    }

    fn create(&self, ttl: Duration) -> Session {
        let key = Ulid::new().to_string();
        let mut sessions = self.lock();
        sessions.retain(|_, stored| !stored.expired());
        sessions.insert(
            key.clone(),
            StoredSession {
                values: HashMap::new(),
                created_at: Instant::now(),
                ttl,
            },
        );
        Session {
            key,
            values: HashMap::new(),
        }
    }

    fn put(&self, key: &str, field: &str, value: &str) {
        let mut sessions = self.lock();
        if let Some(stored) = sessions.get_mut(key).filter(|stored| !stored.expired()) {
            stored.values.insert(field.to_string(), value.to_string());
        }
    }
}
