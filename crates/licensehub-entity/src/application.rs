//! Application entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A licensed product. Only ownership is consulted by the core.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    /// Unique application identifier.
    pub id: Uuid,
    /// The identity that owns the application and its licenses.
    pub owner_id: Uuid,
    /// Product name.
    pub name: String,
    /// Product version.
    pub version: String,
    /// When the application was registered.
    pub created_at: DateTime<Utc>,
}

impl Application {
    /// Check whether `identity_id` owns this application.
    pub fn is_owned_by(&self, identity_id: Uuid) -> bool {
        self.owner_id == identity_id
    }
}

/// Data required to register an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplication {
    /// Owner.
    pub owner_id: Uuid,
    /// Product name.
    pub name: String,
    /// Product version.
    pub version: String,
}
