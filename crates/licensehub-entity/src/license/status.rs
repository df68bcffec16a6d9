//! License status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a license.
///
/// Transitions: `active -> expired` (discovered lazily on validation),
/// `active <-> blocked` (administrative), `active -> suspended | revoked`
/// (administrative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "license_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Usable.
    Active,
    /// Past its expiration instant.
    Expired,
    /// Temporarily withdrawn.
    Suspended,
    /// Permanently withdrawn.
    Revoked,
    /// Blocked by the owner; reversible.
    Blocked,
}

impl LicenseStatus {
    /// Whether the license can be validated or activated.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Suspended => "suspended",
            Self::Revoked => "revoked",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = licensehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "suspended" => Ok(Self::Suspended),
            "revoked" => Ok(Self::Revoked),
            "blocked" => Ok(Self::Blocked),
            _ => Err(licensehub_core::AppError::validation(format!(
                "Invalid license status: '{s}'. Expected one of: active, expired, suspended, revoked, blocked"
            ))),
        }
    }
}
