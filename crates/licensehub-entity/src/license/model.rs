//! License entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::features::FeatureSet;
use super::status::LicenseStatus;

/// A license key record. Only the key hash is stored.
///
/// Invariant: `0 <= activation_count <= max_activations`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct License {
    /// Unique license identifier.
    pub id: Uuid,
    /// SHA-256 hash of the normalized key.
    #[serde(skip_serializing, default)]
    pub key_hash: String,
    /// Owning application.
    pub application_id: Uuid,
    /// Optional owning customer.
    pub customer_id: Option<Uuid>,
    /// Lifecycle status.
    pub status: LicenseStatus,
    /// Optional absolute expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Activation ceiling.
    pub max_activations: i32,
    /// Machines currently holding a slot.
    pub activation_count: i32,
    /// Enabled features.
    #[sqlx(json)]
    pub features: FeatureSet,
    /// Free-form notes.
    pub notes: Option<String>,
    /// When the license was created.
    pub created_at: DateTime<Utc>,
    /// When the license was last updated.
    pub updated_at: DateTime<Utc>,
}

impl License {
    /// Check whether the license has an expiry that is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Whether another machine can claim a slot.
    pub fn has_headroom(&self) -> bool {
        self.activation_count < self.max_activations
    }

    /// Slots still free.
    pub fn remaining_slots(&self) -> i32 {
        (self.max_activations - self.activation_count).max(0)
    }
}

/// Data required to create a license.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLicense {
    /// SHA-256 hash of the normalized key.
    pub key_hash: String,
    /// Owning application.
    pub application_id: Uuid,
    /// Optional owning customer.
    pub customer_id: Option<Uuid>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Activation ceiling.
    pub max_activations: i32,
    /// Enabled features.
    pub features: FeatureSet,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Administrative changes to a license. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLicense {
    /// New expiry; `Some(None)` clears it.
    pub expires_at: Option<Option<DateTime<Utc>>>,
    /// New activation ceiling.
    pub max_activations: Option<i32>,
    /// Replacement feature set.
    pub features: Option<FeatureSet>,
    /// New notes; `Some(None)` clears them.
    pub notes: Option<Option<String>>,
}
