//! Session credential entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Proof of a login.
///
/// Sessions carry no scopes of their own; they inherit every scope the
/// owner's roles grant at verification time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionCredential {
    /// Unique session identifier.
    pub id: Uuid,
    /// The identity this session belongs to.
    pub identity_id: Uuid,
    /// SHA-256 hash of the session token.
    #[serde(skip_serializing, default)]
    pub token_hash: String,
    /// Set on logout or administrative revocation.
    pub is_revoked: bool,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Touched on every successful verification.
    pub last_activity: DateTime<Utc>,
}

impl SessionCredential {
    /// Check whether the session is past its absolute expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Data required to create a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    /// The identity this session belongs to.
    pub identity_id: Uuid,
    /// SHA-256 hash of the session token.
    pub token_hash: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}
