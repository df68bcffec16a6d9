//! Role-to-scope mapping definitions.

use std::collections::HashMap;

use licensehub_entity::identity::{BusinessRole, Identity, SystemRole};
use licensehub_entity::scope::{Scope, ScopeSet};

/// Maps business and system roles to the scopes they grant.
///
/// Immutable once built. An identity's effective scopes are the union of
/// its business-role and system-role grants.
#[derive(Debug, Clone)]
pub struct ScopeCatalog {
    business: HashMap<BusinessRole, ScopeSet>,
    system: HashMap<SystemRole, ScopeSet>,
}

impl ScopeCatalog {
    /// Creates the default catalog.
    pub fn new() -> Self {
        let mut business = HashMap::new();

        // User: full control over their own licensing resources
        let user: ScopeSet = [
            Scope::LicenseRead,
            Scope::LicenseWrite,
            Scope::LicenseDelete,
            Scope::CustomerRead,
            Scope::CustomerWrite,
            Scope::CustomerDelete,
            Scope::ApplicationRead,
            Scope::ApplicationWrite,
            Scope::ApplicationDelete,
            Scope::ActivationRead,
            Scope::ActivationWrite,
            Scope::ActivationDelete,
            Scope::Validation,
            Scope::TokenManagement,
        ]
        .into_iter()
        .collect();
        business.insert(BusinessRole::User, user);

        let mut system = HashMap::new();
        system.insert(
            SystemRole::SystemAdmin,
            [Scope::UserManagement, Scope::TokenManagement]
                .into_iter()
                .collect(),
        );
        system.insert(SystemRole::User, ScopeSet::new());

        Self { business, system }
    }

    /// Creates a catalog with custom tables. Roles missing from a table grant nothing.
    pub fn with_tables(
        business: HashMap<BusinessRole, ScopeSet>,
        system: HashMap<SystemRole, ScopeSet>,
    ) -> Self {
        Self { business, system }
    }

    /// Returns the union of the scopes granted by both roles.
    pub fn scopes_for(&self, business: BusinessRole, system: SystemRole) -> ScopeSet {
        let from_business = self.business.get(&business).cloned().unwrap_or_default();
        let from_system = self.system.get(&system).cloned().unwrap_or_default();
        from_business.union(&from_system)
    }

    /// Returns the scopes an identity's current roles grant.
    pub fn scopes_for_identity(&self, identity: &Identity) -> ScopeSet {
        self.scopes_for(identity.business_role, identity.system_role)
    }
}

impl Default for ScopeCatalog {
    fn default() -> Self {
        Self::new()
    }
}
