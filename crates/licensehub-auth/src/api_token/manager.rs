//! Issue, list, update and delete scoped API tokens.

use std::sync::Arc;

use chrono::Duration;
use tracing::info;
use uuid::Uuid;

use licensehub_core::config::AuthConfig;
use licensehub_core::error::AppError;
use licensehub_core::traits::{Clock, RandomSource};
use licensehub_database::store::{Store, UnitOfWork};
use licensehub_entity::credential::{CreateApiToken, ScopedCredential, UpdateApiToken};
use licensehub_entity::scope::{Scope, ScopeSet};

use crate::authenticator::Principal;
use crate::rbac::{ScopeCatalog, ScopeEnforcer};
use crate::token::{TokenKind, generate_token, hash_token};

/// A freshly issued API token.
#[derive(Debug, Clone)]
pub struct IssuedApiToken {
    /// The plaintext token. Returned exactly once.
    pub token: String,
    /// The stored record.
    pub credential: ScopedCredential,
}

/// Manages the API tokens a principal holds.
///
/// Every operation requires `token:management`. Requested scopes must be a
/// subset of what the holder's roles currently grant.
#[derive(Debug, Clone)]
pub struct ApiTokenManager {
    store: Arc<dyn Store>,
    catalog: Arc<ScopeCatalog>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    config: AuthConfig,
}

impl ApiTokenManager {
    /// Creates a new token manager.
    pub fn new(
        store: Arc<dyn Store>,
        catalog: Arc<ScopeCatalog>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            random,
            config,
        }
    }

    fn check_scopes(&self, principal: &Principal, requested: &ScopeSet) -> Result<(), AppError> {
        if requested.is_empty() {
            return Err(AppError::validation("At least one scope is required"));
        }
        let allowed = self.catalog.scopes_for_identity(&principal.identity);
        if !requested.is_subset(&allowed) {
            return Err(AppError::permission_denied(format!(
                "Scopes not granted by your roles: {}",
                requested.difference(&allowed)
            )));
        }
        Ok(())
    }

    /// Issues a new API token.
    ///
    /// `expires_in_days` defaults to the configured token lifetime.
    pub async fn issue(
        &self,
        principal: &Principal,
        name: &str,
        scopes: ScopeSet,
        expires_in_days: Option<i64>,
    ) -> Result<IssuedApiToken, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::TokenManagement.into())?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Token name must not be empty"));
        }
        self.check_scopes(principal, &scopes)?;
        let days = expires_in_days.unwrap_or(self.config.api_token_ttl_days);
        if days <= 0 {
            return Err(AppError::validation("Token lifetime must be positive"));
        }

        let now = self.clock.now();
        let token = generate_token(self.random.as_ref(), TokenKind::Api);
        let mut uow = self.store.begin().await?;
        let credential = uow
            .insert_api_token(CreateApiToken {
                identity_id: principal.identity.id,
                name: name.to_string(),
                token_hash: hash_token(&token),
                scopes,
                expires_at: Some(now + Duration::days(days)),
                created_at: now,
            })
            .await?;
        uow.commit().await?;

        info!(
            identity_id = %principal.identity.id,
            token_id = %credential.id,
            scopes = %credential.scopes,
            "API token issued"
        );
        Ok(IssuedApiToken { token, credential })
    }

    /// Lists the principal's own tokens.
    pub async fn list(&self, principal: &Principal) -> Result<Vec<ScopedCredential>, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::TokenManagement.into())?;
        let mut uow = self.store.begin().await?;
        uow.list_api_tokens(principal.identity.id).await
    }

    async fn owned_token(
        &self,
        uow: &mut dyn UnitOfWork,
        principal: &Principal,
        token_id: Uuid,
    ) -> Result<ScopedCredential, AppError> {
        uow.find_api_token(token_id)
            .await?
            .filter(|t| t.identity_id == principal.identity.id)
            .ok_or_else(|| AppError::not_found("API token not found"))
    }

    /// Updates the name, scopes or active flag of one of the principal's tokens.
    pub async fn update(
        &self,
        principal: &Principal,
        token_id: Uuid,
        changes: UpdateApiToken,
    ) -> Result<ScopedCredential, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::TokenManagement.into())?;
        if let Some(name) = &changes.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("Token name must not be empty"));
            }
        }
        if let Some(scopes) = &changes.scopes {
            self.check_scopes(principal, scopes)?;
        }

        let mut uow = self.store.begin().await?;
        self.owned_token(uow.as_mut(), principal, token_id).await?;
        let updated = uow.update_api_token(token_id, changes).await?;
        uow.commit().await?;

        info!(identity_id = %principal.identity.id, token_id = %token_id, "API token updated");
        Ok(updated)
    }

    /// Deletes one of the principal's tokens.
    pub async fn delete(&self, principal: &Principal, token_id: Uuid) -> Result<(), AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::TokenManagement.into())?;
        let mut uow = self.store.begin().await?;
        self.owned_token(uow.as_mut(), principal, token_id).await?;
        uow.delete_api_token(token_id).await?;
        uow.commit().await?;

        info!(identity_id = %principal.identity.id, token_id = %token_id, "API token deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::AuthHarness;
    use licensehub_core::error::ErrorKind;

    fn scopes(list: &[Scope]) -> ScopeSet {
        list.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_issue_defaults_to_configured_lifetime() {
        let h = AuthHarness::new();
        let principal = h.principal(&h.login_new("alice").await).await;
        let issued = h
            .tokens
            .issue(&principal, "deploy", scopes(&[Scope::Validation]), None)
            .await
            .unwrap();
        assert!(issued.token.starts_with("lt_"));
        assert_eq!(
            issued.credential.expires_at,
            Some(h.clock.now() + Duration::days(365))
        );
    }

    #[tokio::test]
    async fn test_issue_rejects_scopes_beyond_roles() {
        let h = AuthHarness::new();
        let principal = h.principal(&h.login_new("bob").await).await;
        let err = h
            .tokens
            .issue(
                &principal,
                "too-much",
                scopes(&[Scope::LicenseRead, Scope::UserManagement]),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
        assert!(err.message.contains("user:management"));
    }

    #[tokio::test]
    async fn test_token_without_token_management_cannot_manage_tokens() {
        let h = AuthHarness::new();
        let session = h.principal(&h.login_new("carol").await).await;
        let issued = h
            .tokens
            .issue(&session, "reader", scopes(&[Scope::LicenseRead]), None)
            .await
            .unwrap();
        let via_token = h.principal(&issued.token).await;
        let err = h.tokens.list(&via_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_update_list_and_delete_own_tokens_only() {
        let h = AuthHarness::new();
        let alice = h.principal(&h.login_new("alice").await).await;
        let mallory = h.principal(&h.login_new("mallory").await).await;
        let issued = h
            .tokens
            .issue(&alice, "sdk", scopes(&[Scope::Validation]), Some(7))
            .await
            .unwrap();
        let id = issued.credential.id;

        let err = h
            .tokens
            .update(&mallory, id, UpdateApiToken::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let updated = h
            .tokens
            .update(
                &alice,
                id,
                UpdateApiToken {
                    name: Some("sdk-renamed".into()),
                    is_active: Some(false),
                    ..UpdateApiToken::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "sdk-renamed");
        assert!(h.authenticator.authenticate(Some(&issued.token)).await.is_err());

        assert_eq!(h.tokens.list(&alice).await.unwrap().len(), 1);
        assert!(h.tokens.list(&mallory).await.unwrap().is_empty());

        assert!(h.tokens.delete(&mallory, id).await.is_err());
        h.tokens.delete(&alice, id).await.unwrap();
        assert!(h.tokens.list(&alice).await.unwrap().is_empty());
    }
}
