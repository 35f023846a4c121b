//! Server-side sessions
//!
//! Raw session identifiers are 32 random bytes, base64url-encoded, and
//! live only in the client cookie. The store keys entries by the SHA-256
//! hash of the raw value, so a leaked store dump reveals neither cookie
//! values nor anything derived from the user's subject id.

use std::collections::HashMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::identity::UserIdentity;

/// An authenticated session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub identity: UserIdentity,
    pub authenticated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// In-process TTL session store.
pub struct SessionStore {
    entries: RwLock<HashMap<String, Session>>,
    ttl_secs: i64,
}

impl SessionStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl_secs,
        }
    }

    /// Create a session for an authenticated identity.
    ///
    /// Returns the raw id (for the cookie) and the session. Only the
    /// hash of the raw id is kept server-side.
    pub fn create(&self, identity: UserIdentity) -> (String, Session) {
        let raw_id = generate_session_id();
        let now = Utc::now();
        let session = Session {
            identity,
            authenticated_at: now,
            expires_at: now + Duration::seconds(self.ttl_secs),
        };

        self.entries
            .write()
            .insert(hash_session_id(&raw_id), session.clone());

        (raw_id, session)
    }

    /// Look up a session by raw id. Expired entries are removed on the
    /// spot, so correctness never depends on the background sweep.
    pub fn get(&self, raw_id: &str) -> Option<Session> {
        let key = hash_session_id(raw_id);

        let session = self.entries.read().get(&key).cloned()?;
        if session.is_expired() {
            self.entries.write().remove(&key);
            return None;
        }
        Some(session)
    }

    /// Extend a live session's expiry by the configured TTL (sliding
    /// window). No-op when the session is missing or expired.
    pub fn touch(&self, raw_id: &str) -> Option<Session> {
        let key = hash_session_id(raw_id);
        let mut entries = self.entries.write();

        let session = entries.get_mut(&key)?;
        if session.is_expired() {
            entries.remove(&key);
            return None;
        }

        session.expires_at = Utc::now() + Duration::seconds(self.ttl_secs);
        Some(session.clone())
    }

    /// Destroy a session. Returns true when a session was removed.
    pub fn destroy(&self, raw_id: &str) -> bool {
        self.entries
            .write()
            .remove(&hash_session_id(raw_id))
            .is_some()
    }

    /// Remove expired sessions, returning how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, s| !s.is_expired());
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Generate a raw session id: 32 random bytes, base64url without padding.
fn generate_session_id() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a raw session id for storage.
fn hash_session_id(raw_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_id.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
