//! Client-owned sliding-window sessions.
//!
//! The server never sees session state, only the opaque id attached to each
//! beacon. A session lives for [`SESSION_TTL_MINUTES`] after the last activity.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;

pub const SESSION_ID_KEY: &str = "sitepulse_session_id";
pub const SESSION_EXPIRY_KEY: &str = "sitepulse_session_expiry";
pub const SESSION_TTL_MINUTES: i64 = 30;
const SESSION_ID_LEN: usize = 16;

/// Client-persisted key/value store holding the two session keys.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

/// Process-local storage. Sessions do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.values.lock().insert(key.to_string(), value);
    }
}

/// What [`SessionManager::ensure_session`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// A fresh id was minted; the caller must announce it with `session_start`.
    Started(String),
    /// The live session was extended.
    Continued(String),
}

impl SessionState {
    pub fn id(&self) -> &str {
        match self {
            Self::Started(id) | Self::Continued(id) => id,
        }
    }

    pub const fn is_new(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

pub struct SessionManager<S> {
    storage: S,
    ttl: TimeDelta,
}

impl<S: SessionStorage> SessionManager<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            ttl: TimeDelta::minutes(SESSION_TTL_MINUTES),
        }
    }

    /// Current session id, if one is stored. Does not check expiry.
    pub fn current_id(&self) -> Option<String> {
        self.storage.get(SESSION_ID_KEY)
    }

    /// Start a session if none is live at `now`, otherwise slide its expiry.
    pub fn ensure_session(&self, now: DateTime<Utc>) -> SessionState {
        let expires_at = now + self.ttl;
        let live = self
            .storage
            .get(SESSION_ID_KEY)
            .filter(|id| !id.is_empty())
            .filter(|_| self.expiry().is_some_and(|expiry| now < expiry));

        let state = live.map_or_else(
            || {
                let id = new_session_id();
                self.storage.set(SESSION_ID_KEY, id.clone());
                SessionState::Started(id)
            },
            SessionState::Continued,
        );
        self.storage
            .set(SESSION_EXPIRY_KEY, expires_at.timestamp_millis().to_string());
        state
    }

    fn expiry(&self) -> Option<DateTime<Utc>> {
        self.storage
            .get(SESSION_EXPIRY_KEY)
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
    }
}

/// Random 16-character alphanumeric token.
pub fn new_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}
