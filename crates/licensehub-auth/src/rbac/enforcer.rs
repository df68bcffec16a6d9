//! Scope enforcement. Every check fails closed.

use std::fmt;

use licensehub_core::error::AppError;
use licensehub_entity::scope::{Scope, ScopeSet};

/// What a caller must hold to perform an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A single scope.
    One(Scope),
    /// At least one of the listed scopes. Empty never passes.
    Any(Vec<Scope>),
    /// Every listed scope. Empty never passes.
    All(Vec<Scope>),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |scopes: &[Scope]| {
            scopes
                .iter()
                .map(Scope::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Self::One(scope) => write!(f, "{scope}"),
            Self::Any(scopes) => write!(f, "any of [{}]", join(scopes)),
            Self::All(scopes) => write!(f, "all of [{}]", join(scopes)),
        }
    }
}

impl From<Scope> for Requirement {
    fn from(scope: Scope) -> Self {
        Self::One(scope)
    }
}

/// Checks granted scopes against requirements.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeEnforcer;

impl ScopeEnforcer {
    /// Whether `granted` satisfies `requirement`.
    pub fn authorize(granted: &ScopeSet, requirement: &Requirement) -> bool {
        match requirement {
            Requirement::One(scope) => granted.contains(*scope),
            Requirement::Any(scopes) => scopes.iter().any(|s| granted.contains(*s)),
            Requirement::All(scopes) => {
                !scopes.is_empty() && scopes.iter().all(|s| granted.contains(*s))
            }
        }
    }

    /// Fails with `PermissionDenied` unless `granted` satisfies `requirement`.
    pub fn require(granted: &ScopeSet, requirement: &Requirement) -> Result<(), AppError> {
        if Self::authorize(granted, requirement) {
            Ok(())
        } else {
            Err(AppError::permission_denied(format!(
                "Missing required scope: {requirement}"
            )))
        }
    }
}
