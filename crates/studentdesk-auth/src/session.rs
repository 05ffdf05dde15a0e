//! Server-side sessions referenced by the session cookie.
//!
//! Sessions live in a moka cache. With sliding expiration the entry uses
//! `time_to_idle`, so every lookup pushes the deadline forward; otherwise it
//! uses `time_to_live` and expires a fixed time after sign-in.
//!
//! The browser side of a sliding session is kept alive by re-issuing the
//! cookie once half of its lifetime has passed (see [`SessionStore::renewal_due`]).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use moka::future::Cache;
use rand::RngCore;
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::CookieConfig;
use crate::policy::Principal;
use crate::storage::User;

const TOKEN_BYTES: usize = 32;
const DEFAULT_MAX_SESSIONS: u64 = 100_000;

/// A signed-in session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(skip)]
    pub token: String,
    pub principal: Principal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the cookie carrying this session was last sent.
    #[serde(skip)]
    cookie_issued: Mutex<Instant>,
}

/// In-memory session store.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, Arc<Session>>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration, sliding: bool) -> Self {
        Self::with_capacity(lifetime, sliding, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_capacity(lifetime: Duration, sliding: bool, max_sessions: u64) -> Self {
        let builder = Cache::builder().max_capacity(max_sessions);
        let sessions = if sliding {
            builder.time_to_idle(lifetime).build()
        } else {
            builder.time_to_live(lifetime).build()
        };

        Self { sessions, lifetime }
    }

    pub fn from_config(config: &CookieConfig) -> Self {
        Self::new(config.expire_time, config.sliding_expiration)
    }

    /// Opens a session for the user and returns it.
    pub async fn create(&self, user: &User) -> Arc<Session> {
        let session = Arc::new(Session {
            token: generate_token(),
            principal: Principal::from(user),
            created_at: OffsetDateTime::now_utc(),
            cookie_issued: Mutex::new(Instant::now()),
        });
        self.sessions
            .insert(session.token.clone(), session.clone())
            .await;
        tracing::debug!(user_id = %user.id, "Session created");
        session
    }

    /// Looks up a live session. A hit counts as activity for sliding expiry.
    pub async fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.sessions.get(token).await
    }

    /// Ends a session. Unknown tokens are ignored.
    pub async fn remove(&self, token: &str) {
        self.sessions.invalidate(token).await;
    }

    /// Returns `true`, and restarts the clock, when the session cookie was
    /// issued at least half a lifetime ago.
    pub fn renewal_due(&self, session: &Session) -> bool {
        let Ok(mut issued) = session.cookie_issued.lock() else {
            return false;
        };
        if issued.elapsed() < self.lifetime / 2 {
            return false;
        }
        *issued = Instant::now();
        true
    }

    #[cfg(test)]
    async fn len(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
