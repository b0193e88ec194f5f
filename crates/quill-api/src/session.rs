use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "quill_session";

const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Server-side session table: opaque token -> identity. Sessions carry an
/// absolute 24-hour lifetime; there is no background sweeper, expired
/// entries are dropped on their next lookup.
pub struct SessionStore {
    ttl: Duration,
    inner: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(SESSION_TTL_HOURS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, user_id: i64, username: &str) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let session = Session {
            user_id,
            username: username.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        self.lock()?.insert(token.clone(), session);
        Ok(token)
    }

    /// Lazy expiry: an expired session is removed here and reported as absent.
    pub fn get(&self, token: &str) -> Result<Option<Session>> {
        let mut sessions = self.lock()?;
        match sessions.get(token) {
            Some(session) if session.expires_at > Utc::now() => Ok(Some(session.clone())),
            Some(_) => {
                sessions.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn destroy(&self, token: &str) -> Result<()> {
        self.lock()?.remove(token);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>> {
        self.inner
            .lock()
            .map_err(|e| anyhow!("session store lock poisoned: {}", e))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
