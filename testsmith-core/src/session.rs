//! In-memory credential sessions.
//!
//! Each authenticated caller gets an opaque [`SessionId`] bound to its own
//! [`Credential`]. Sessions live only in process memory and expire after a period
//! of inactivity, or when removed explicitly at logout.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use uuid::Uuid;

use crate::contract::Credential;

/// Opaque session identifier handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Session {
    credential: Credential,
    last_seen: Instant,
}

/// Session table mapping session identifiers to credentials.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a new session for `credential`.
    pub fn create(&self, credential: Credential) -> SessionId {
        let id = SessionId::generate();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(
            id.clone(),
            Session {
                credential,
                last_seen: Instant::now(),
            },
        );
        info!(active_sessions = sessions.len(), "[AUTH] Session created");
        id
    }

    /// Replaces the credential of a live session. Returns `false` when the session is
    /// unknown or has expired.
    pub fn set(&self, id: &SessionId, credential: Credential) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        match sessions.get_mut(id) {
            Some(s) if s.last_seen.elapsed() < self.ttl => {
                s.credential = credential;
                s.last_seen = Instant::now();
                debug!("[AUTH] Session credential replaced");
                true
            }
            Some(_) => {
                sessions.remove(id);
                false
            }
            None => false,
        }
    }

    /// Returns the session's credential and marks the session active. Expired
    /// sessions are dropped and read as absent.
    pub fn get(&self, id: &SessionId) -> Option<Credential> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let expired = match sessions.get_mut(id) {
            Some(s) if s.last_seen.elapsed() < self.ttl => {
                s.last_seen = Instant::now();
                return Some(s.credential.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(id);
            debug!("[AUTH] Expired session dropped on access");
        }
        None
    }

    /// Ends a session. Returns whether it existed.
    pub fn remove(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let removed = sessions.remove(id).is_some();
        if removed {
            info!(active_sessions = sessions.len(), "[AUTH] Session removed");
        }
        removed
    }

    /// Drops every session idle for longer than the TTL. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen.elapsed() < self.ttl);
        let purged = before - sessions.len();
        if purged > 0 {
            info!(purged, remaining = sessions.len(), "[AUTH] Purged expired sessions");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
