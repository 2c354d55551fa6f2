// Authentication Types
//
// Domain types shared by the OIDC client adapter, the session store and the
// HTTP layer: provider keys, the normalized identity, the pending login
// carried across the authorization redirect, and the server-side session
// record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the supported identity providers
///
/// The wire form doubles as the route prefix under which the provider's
/// login flow and protected content are mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKey {
    #[serde(rename = "auth-gcp")]
    Gcp,
    #[serde(rename = "auth-azure")]
    Azure,
    #[serde(rename = "auth-yahoo")]
    Yahoo,
}

impl ProviderKey {
    pub const ALL: [ProviderKey; 3] = [ProviderKey::Gcp, ProviderKey::Azure, ProviderKey::Yahoo];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKey::Gcp => "auth-gcp",
            ProviderKey::Azure => "auth-azure",
            ProviderKey::Yahoo => "auth-yahoo",
        }
    }

    /// Human-readable provider name for the demo pages
    pub fn title(&self) -> &'static str {
        match self {
            ProviderKey::Gcp => "GCP",
            ProviderKey::Azure => "Azure",
            ProviderKey::Yahoo => "Yahoo",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "auth-gcp" => Some(ProviderKey::Gcp),
            "auth-azure" => Some(ProviderKey::Azure),
            "auth-yahoo" => Some(ProviderKey::Yahoo),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized identity produced by a successful login
///
/// Providers differ in what their userinfo endpoint exposes (Yahoo returns
/// no display name), so the optional fields are explicit options rather than
/// assumed-present properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Subject identifier, unique per provider
    pub subject: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// The userinfo response as returned by the provider
    pub raw_profile: serde_json::Value,
    pub provider: ProviderKey,
}

/// State carried across the authorization redirect, keyed by `state`
///
/// Consumed exactly once when the matching callback arrives; a reused or
/// unknown `state` never completes a login.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub state: String,
    pub nonce: String,
    pub pkce_verifier: String,
    pub provider: ProviderKey,
    pub created_at: DateTime<Utc>,
}

/// Server-side session record
///
/// The client only ever holds the opaque `session_id` (signed, in a cookie);
/// the identity and provider tag stay on this side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub identity: Identity,
    pub provider: ProviderKey,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// Error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("state parameter mismatch")]
    StateMismatch,

    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("invalid ID token: {0}")]
    TokenInvalid(String),

    #[error("userinfo request failed: {0}")]
    UserinfoFailed(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    #[error("session belongs to a different provider")]
    SessionProviderMismatch,
}

/// Server-side session storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a fresh record for an authenticated identity and return it,
    /// session id included
    async fn create(&self, identity: Identity) -> SessionRecord;

    /// Look up a live session. Never returns an expired record: the first
    /// lookup past expiry removes it and reports `SessionExpired`, any later
    /// lookup `SessionNotFound`.
    async fn get(&self, session_id: &str) -> Result<SessionRecord, AuthError>;

    /// Remove a record; returns whether one existed
    async fn destroy(&self, session_id: &str) -> bool;

    /// Drop expired records, returning how many were removed
    async fn cleanup_expired(&self) -> usize;
}
