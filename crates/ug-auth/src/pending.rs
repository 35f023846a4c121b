//! Pending Authorization State
//!
//! Stores the state needed to correlate an OIDC callback with the login
//! request that started it:
//! 1. Validate the callback is legitimate (CSRF protection via state)
//! 2. Prevent replay attacks (nonce validation)
//! 3. Exchange the code securely (PKCE code_verifier)

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Default expiry duration: 10 minutes
pub const PENDING_EXPIRY_SECONDS: i64 = 600;

/// State stored between login start and the provider callback.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    /// Random state parameter, the primary key and CSRF token
    pub state: String,

    /// Nonce for ID token validation (prevents replay attacks)
    pub nonce: String,

    /// PKCE code verifier (stored locally, challenge sent to the IDP)
    pub code_verifier: String,

    /// When this record was created
    pub created_at: DateTime<Utc>,

    /// When this record expires
    pub expires_at: DateTime<Utc>,
}

impl PendingAuthorization {
    pub fn new(
        state: impl Into<String>,
        nonce: impl Into<String>,
        code_verifier: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            state: state.into(),
            nonce: nonce.into(),
            code_verifier: code_verifier.into(),
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// In-process store for pending authorizations, keyed by state.
pub struct PendingAuthorizationStore {
    entries: RwLock<HashMap<String, PendingAuthorization>>,
}

impl PendingAuthorizationStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, pending: PendingAuthorization) {
        self.entries.write().insert(pending.state.clone(), pending);
    }

    /// Consume a pending record by state.
    ///
    /// The entry is removed whether or not it has expired, so a state
    /// value can never be accepted twice. Returns Some only when the
    /// record existed and was still valid.
    pub fn consume(&self, state: &str) -> Option<PendingAuthorization> {
        let removed = self.entries.write().remove(state)?;
        if removed.is_expired() {
            return None;
        }
        Some(removed)
    }

    /// Remove expired records, returning how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, p| !p.is_expired());
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for PendingAuthorizationStore {
    fn default() -> Self {
        Self::new()
    }
}
