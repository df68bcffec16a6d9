//! Activation entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Status of an activation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivationStatus {
    /// Holding a slot.
    Active,
    /// Retained for history; holds no slot.
    Inactive,
}

/// A machine holding a slot on a license.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activation {
    /// Unique activation identifier.
    pub id: Uuid,
    /// License the slot belongs to.
    pub license_id: Uuid,
    /// Hardware fingerprint reported by the client.
    pub machine_fingerprint: String,
    /// Optional machine label.
    pub machine_name: Option<String>,
    /// Address the first activation came from.
    pub origin_address: Option<String>,
    /// Slot status.
    pub status: ActivationStatus,
    /// First successful claim.
    pub activated_at: DateTime<Utc>,
    /// Last successful validation from this machine.
    pub last_heartbeat: DateTime<Utc>,
}

impl Activation {
    /// Whether the activation currently holds a slot.
    pub fn is_active(&self) -> bool {
        self.status == ActivationStatus::Active
    }
}

/// Data required to record a new activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActivation {
    /// License the slot belongs to.
    pub license_id: Uuid,
    /// Hardware fingerprint.
    pub machine_fingerprint: String,
    /// Optional machine label.
    pub machine_name: Option<String>,
    /// Optional origin address.
    pub origin_address: Option<String>,
    /// Claim time.
    pub activated_at: DateTime<Utc>,
}
