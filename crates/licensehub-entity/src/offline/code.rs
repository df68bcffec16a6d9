//! Offline activation code entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A pre-generated, single-use activation secret.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfflineActivationCode {
    /// Unique code identifier.
    pub id: Uuid,
    /// License the code activates.
    pub license_id: Uuid,
    /// The secret itself.
    pub code: String,
    /// Optional machine the code is pinned to.
    pub machine_fingerprint: Option<String>,
    /// Set once the code is redeemed.
    pub is_used: bool,
    /// When the code was generated.
    pub created_at: DateTime<Utc>,
    /// End of the redemption window.
    pub expires_at: DateTime<Utc>,
    /// When the code was redeemed.
    pub used_at: Option<DateTime<Utc>>,
}

impl OfflineActivationCode {
    /// Check whether the redemption window has closed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the code may be used by `fingerprint`.
    pub fn admits_machine(&self, fingerprint: &str) -> bool {
        self.machine_fingerprint
            .as_deref()
            .is_none_or(|pinned| pinned == fingerprint)
    }
}

/// Data required to store a generated code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOfflineCode {
    /// License the code activates.
    pub license_id: Uuid,
    /// The secret.
    pub code: String,
    /// Optional pin.
    pub machine_fingerprint: Option<String>,
    /// Generation time.
    pub created_at: DateTime<Utc>,
    /// End of the window.
    pub expires_at: DateTime<Utc>,
}
