//! Scoped API token entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::scope::ScopeSet;

/// A long-lived credential with an explicit scope grant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScopedCredential {
    /// Unique token identifier.
    pub id: Uuid,
    /// The identity that owns the token.
    pub identity_id: Uuid,
    /// Human-readable label.
    pub name: String,
    /// SHA-256 hash of the token.
    #[serde(skip_serializing, default)]
    pub token_hash: String,
    /// Explicitly granted scopes.
    #[sqlx(json)]
    pub scopes: ScopeSet,
    /// Inactive tokens are rejected.
    pub is_active: bool,
    /// Optional absolute expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Touched on every successful verification.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
}

impl ScopedCredential {
    /// Check whether the token has an expiry and it has passed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Data required to issue a new API token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApiToken {
    /// Owner.
    pub identity_id: Uuid,
    /// Label.
    pub name: String,
    /// SHA-256 hash of the token.
    pub token_hash: String,
    /// Granted scopes.
    pub scopes: ScopeSet,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Issue time.
    pub created_at: DateTime<Utc>,
}

/// Fields a token holder may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateApiToken {
    /// New label.
    pub name: Option<String>,
    /// Replacement scope set.
    pub scopes: Option<ScopeSet>,
    /// New active flag.
    pub is_active: Option<bool>,
}
