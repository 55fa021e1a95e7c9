//! Sessions
//!
//! Opaque-token sessions issued by login and an explicit store object for
//! them. The store is injected into the components that need it; nothing
//! reads ambient global state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::user::random_hex;

/// A login session. Holds a non-owning reference to its user; the access
/// controller reads sessions but never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Issue a fresh session for a user with a random opaque token.
    pub fn issue(user_id: Uuid) -> Self {
        Self {
            user_id,
            token: random_hex(32),
            issued_at: Utc::now(),
        }
    }
}

/// In-memory session store.
///
/// Sessions never expire inside the engine; expiry, if desired, is an
/// external-clock decision layered on top of `issued_at`.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly issued session.
    pub async fn insert(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session);
    }

    /// Resolve a token to its session, if still live.
    pub async fn resolve(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Revoke a session. Returns whether the token was live.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
