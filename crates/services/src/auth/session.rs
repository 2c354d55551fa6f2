// In-memory session storage
//
// Sessions and pending logins both live in a `RwLock<HashMap>` keyed by an
// opaque token. Records are replaced wholesale, never mutated in place, so
// the map lock is the only synchronization. Expiry is lazy on lookup; the
// periodic sweep only reclaims memory.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use rand::RngCore;
use tokio::sync::RwLock;
use tracing::debug;

use super::ports::{AuthError, Identity, PendingLogin, SessionRecord, SessionStore};

/// Base64url-encoded random token
pub(crate) fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Session store backed by process memory, as in the original demo setup
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, identity: Identity) -> SessionRecord {
        let now = Utc::now();
        let session_id = random_token(32);
        let record = SessionRecord {
            session_id: session_id.clone(),
            provider: identity.provider,
            identity,
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, record.clone());
        record
    }

    async fn get(&self, session_id: &str) -> Result<SessionRecord, AuthError> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                Some(record) if record.expires_at > Utc::now() => return Ok(record.clone()),
                Some(_) => {}
                None => return Err(AuthError::SessionNotFound),
            }
        }

        // Expired records are dropped on first sight and never returned
        self.sessions.write().await.remove(session_id);
        debug!("session expired");
        Err(AuthError::SessionExpired)
    }

    async fn destroy(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| record.expires_at > now);
        before - sessions.len()
    }
}

/// Pending logins awaiting their authorization callback, keyed by `state`
///
/// `take` is remove-on-read, so a `state` value authorizes at most one
/// callback. Entries that never see a callback expire with the same TTL as
/// sessions and are swept alongside them.
pub struct PendingLoginStore {
    ttl: Duration,
    pending: RwLock<HashMap<String, PendingLogin>>,
}

impl PendingLoginStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            pending: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, login: PendingLogin) {
        let mut pending = self.pending.write().await;
        pending.insert(login.state.clone(), login);
    }

    /// Consume the pending login for a callback `state`, exactly once
    pub async fn take(&self, state: &str) -> Option<PendingLogin> {
        let login = self.pending.write().await.remove(state)?;
        if login.created_at + self.ttl <= Utc::now() {
            debug!("pending login expired before its callback arrived");
            return None;
        }
        Some(login)
    }

    pub async fn cleanup_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let mut pending = self.pending.write().await;
        let before = pending.len();
        pending.retain(|_, login| login.created_at > cutoff);
        before - pending.len()
    }
}
