//! Identity entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::{BusinessRole, SystemRole};

/// A principal that can log in and own applications.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Identity {
    /// Unique identity identifier.
    pub id: Uuid,
    /// Unique login handle.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Argon2id password hash in PHC format.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Governs resource-management scopes.
    pub business_role: BusinessRole,
    /// Governs administrative scopes.
    pub system_role: SystemRole,
    /// Inactive identities cannot authenticate.
    pub is_active: bool,
    /// When the identity was registered.
    pub created_at: DateTime<Utc>,
    /// When the identity was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Check if this identity holds the system administrator role.
    pub fn is_system_admin(&self) -> bool {
        self.system_role.is_admin()
    }
}

/// Data required to register a new identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIdentity {
    /// Desired username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Pre-hashed password.
    pub password_hash: String,
    /// Assigned business role.
    pub business_role: BusinessRole,
    /// Assigned system role.
    pub system_role: SystemRole,
}
