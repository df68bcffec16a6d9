//! Capability scopes carried by credentials.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single granted capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    /// Read licenses.
    #[serde(rename = "license:read")]
    LicenseRead,
    /// Create and update licenses.
    #[serde(rename = "license:write")]
    LicenseWrite,
    /// Delete licenses.
    #[serde(rename = "license:delete")]
    LicenseDelete,
    /// Read customers.
    #[serde(rename = "customer:read")]
    CustomerRead,
    /// Create and update customers.
    #[serde(rename = "customer:write")]
    CustomerWrite,
    /// Delete customers.
    #[serde(rename = "customer:delete")]
    CustomerDelete,
    /// Read applications.
    #[serde(rename = "application:read")]
    ApplicationRead,
    /// Create and update applications.
    #[serde(rename = "application:write")]
    ApplicationWrite,
    /// Delete applications.
    #[serde(rename = "application:delete")]
    ApplicationDelete,
    /// Read activations.
    #[serde(rename = "activation:read")]
    ActivationRead,
    /// Create activations and offline codes.
    #[serde(rename = "activation:write")]
    ActivationWrite,
    /// Deactivate machines.
    #[serde(rename = "activation:delete")]
    ActivationDelete,
    /// Validate licenses through an SDK token.
    #[serde(rename = "validation")]
    Validation,
    /// Manage identities.
    #[serde(rename = "user:management")]
    UserManagement,
    /// Manage one's own API tokens.
    #[serde(rename = "token:management")]
    TokenManagement,
}

impl Scope {
    /// Every known scope.
    pub const ALL: [Scope; 15] = [
        Self::LicenseRead,
        Self::LicenseWrite,
        Self::LicenseDelete,
        Self::CustomerRead,
        Self::CustomerWrite,
        Self::CustomerDelete,
        Self::ApplicationRead,
        Self::ApplicationWrite,
        Self::ApplicationDelete,
        Self::ActivationRead,
        Self::ActivationWrite,
        Self::ActivationDelete,
        Self::Validation,
        Self::UserManagement,
        Self::TokenManagement,
    ];

    /// Return the wire name of the scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LicenseRead => "license:read",
            Self::LicenseWrite => "license:write",
            Self::LicenseDelete => "license:delete",
            Self::CustomerRead => "customer:read",
            Self::CustomerWrite => "customer:write",
            Self::CustomerDelete => "customer:delete",
            Self::ApplicationRead => "application:read",
            Self::ApplicationWrite => "application:write",
            Self::ApplicationDelete => "application:delete",
            Self::ActivationRead => "activation:read",
            Self::ActivationWrite => "activation:write",
            Self::ActivationDelete => "activation:delete",
            Self::Validation => "validation",
            Self::UserManagement => "user:management",
            Self::TokenManagement => "token:management",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = licensehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| licensehub_core::AppError::validation(format!("Unknown scope: '{s}'")))
    }
}

/// An ordered set of scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<Scope>);

impl ScopeSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Whether `scope` is granted.
    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    /// Adds a scope.
    pub fn insert(&mut self, scope: Scope) -> bool {
        self.0.insert(scope)
    }

    /// Scopes present in both sets.
    pub fn intersection(&self, other: &ScopeSet) -> ScopeSet {
        Self(self.0.intersection(&other.0).copied().collect())
    }

    /// Scopes present in either set.
    pub fn union(&self, other: &ScopeSet) -> ScopeSet {
        Self(self.0.union(&other.0).copied().collect())
    }

    /// Scopes in `self` that `other` does not grant.
    pub fn difference(&self, other: &ScopeSet) -> ScopeSet {
        Self(self.0.difference(&other.0).copied().collect())
    }

    /// Whether every scope here is also in `other`.
    pub fn is_subset(&self, other: &ScopeSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Number of scopes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in order.
    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Scope::as_str).collect();
        write!(f, "{}", names.join(", "))
    }
}
