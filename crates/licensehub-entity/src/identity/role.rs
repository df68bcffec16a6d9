//! Business and system role enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role governing license, customer, application and activation scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "business_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BusinessRole {
    /// Standard user managing their own resources.
    User,
}

impl BusinessRole {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
        }
    }
}

impl fmt::Display for BusinessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BusinessRole {
    type Err = licensehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            _ => Err(licensehub_core::AppError::validation(format!(
                "Invalid business role: '{s}'. Expected: user"
            ))),
        }
    }
}

/// Role governing administrative scopes such as identity management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "system_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    /// Can manage identities and system settings.
    SystemAdmin,
    /// Regular user without administrative scopes.
    User,
}

impl SystemRole {
    /// Check if this role is the administrator role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::SystemAdmin)
    }

    /// Return the role as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemAdmin => "system_admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SystemRole {
    type Err = licensehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system_admin" => Ok(Self::SystemAdmin),
            "user" => Ok(Self::User),
            _ => Err(licensehub_core::AppError::validation(format!(
                "Invalid system role: '{s}'. Expected one of: system_admin, user"
            ))),
        }
    }
}
