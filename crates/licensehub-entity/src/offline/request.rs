//! Activation request form entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of an offline activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for an activation code.
    Pending,
    /// Closed by a redeemed code.
    Completed,
    /// Past its window.
    Expired,
}

impl RequestStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pending offline-activation handshake.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivationRequestForm {
    /// Unique form identifier.
    pub id: Uuid,
    /// Short code the offline machine transcribes.
    pub request_code: String,
    /// Target license.
    pub license_id: Uuid,
    /// Target machine.
    pub machine_fingerprint: String,
    /// Optional machine label.
    pub machine_name: Option<String>,
    /// Lifecycle status.
    pub status: RequestStatus,
    /// The activation code that closed the form.
    pub activation_code: Option<String>,
    /// When the form was created.
    pub created_at: DateTime<Utc>,
    /// End of the redemption window.
    pub expires_at: DateTime<Utc>,
    /// When the form was completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ActivationRequestForm {
    /// Check whether the redemption window has closed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Status as observed at `now`; pending forms past their window read as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> RequestStatus {
        match self.status {
            RequestStatus::Pending if self.is_expired_at(now) => RequestStatus::Expired,
            other => other,
        }
    }
}

/// Data required to open a request form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestForm {
    /// Short request code.
    pub request_code: String,
    /// Target license.
    pub license_id: Uuid,
    /// Target machine.
    pub machine_fingerprint: String,
    /// Optional machine label.
    pub machine_name: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// End of the window.
    pub expires_at: DateTime<Utc>,
}
