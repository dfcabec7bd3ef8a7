use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{Session, SessionPatch};

/// Thread-safe in-memory session store.
/// Expiry is lazy on read plus the host-driven `cleanup` sweep; the store
/// never schedules its own eviction.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        info!("Initializing session store (ttl: {:?})", ttl);
        Self {
            storage: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Create a session with an empty state bag. The returned record carries
    /// the generated identifier; no uniqueness retry is needed given the
    /// UUID space.
    pub fn create(&self, user_id: &str) -> Session {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), user_id.to_string());
        self.storage.insert(id.clone(), session.clone());
        debug!("Created session {} for user {}", id, user_id);
        session
    }

    /// Resolve a session by id, refreshing `last_accessed`. An unknown or
    /// expired id is not an error; it signals "create a new session".
    pub fn get(&self, id: &str) -> Option<Session> {
        let mut entry = self.storage.get_mut(id)?;
        if entry.is_expired(self.ttl) {
            drop(entry); // Release write lock before removal
            self.storage.remove(id);
            debug!("Session {} expired, removed", id);
            return None;
        }
        entry.touch();
        Some(entry.value().clone())
    }

    /// Shallow-merge `patch` into the stored state bag and refresh
    /// `last_accessed`. Returns whether the session existed.
    pub fn update_state(&self, id: &str, patch: SessionPatch) -> bool {
        let Some(mut entry) = self.storage.get_mut(id) else {
            return false;
        };
        if entry.is_expired(self.ttl) {
            drop(entry);
            self.storage.remove(id);
            return false;
        }
        entry.state.apply(patch);
        entry.touch();
        true
    }

    /// Drop sessions idle longer than the TTL. Returns the number removed.
    /// Must be driven by the host's periodic sweeper task.
    pub fn cleanup(&self) -> usize {
        let ttl = self.ttl;
        let before = self.storage.len();
        self.storage.retain(|_, session| !session.is_expired(ttl));
        let removed = before.saturating_sub(self.storage.len());
        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
