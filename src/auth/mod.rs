//! Session boundary.
//!
//! The OAuth login flow is an external collaborator; it deposits sessions
//! into the [`SessionStore`] and hands the token to the client. The core
//! only ever checks that a presented bearer token maps to a live session
//! and forwards the session's provider credential.

pub mod guards;

pub use guards::SessionUser;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed bearer token")]
    Unauthorized,
    #[error("session has expired")]
    SessionExpired,
}

/// Why a request was rejected at the session boundary; stashed in the
/// request-local cache so the 401 catcher can pick the right wire error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthRejection {
    #[default]
    NotAuthenticated,
    Expired,
}

/// One authenticated session: the provider credential plus its lifetime.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Process-wide token → session map. Insert happens outside the core (login
/// flow or startup bootstrap); the reaper sweeps expired entries. Cloning
/// is cheap and shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: std::sync::Arc<DashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: impl Into<String>, access_token: impl Into<String>, ttl: Duration) {
        let now = Utc::now();
        let ttl = ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::hours(24));
        self.sessions.insert(
            token.into(),
            Session {
                access_token: access_token.into(),
                created_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// Look up a live session. Expired entries are reported as such and
    /// left for the reaper so repeated polls stay cheap.
    pub fn get(&self, token: &str) -> Result<Session, AuthError> {
        let session = self
            .sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(AuthError::Unauthorized)?;
        if session.is_expired(Utc::now()) {
            return Err(AuthError::SessionExpired);
        }
        Ok(session)
    }

    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop expired sessions; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
