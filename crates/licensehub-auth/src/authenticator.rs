//! Bearer credential verification.
//!
//! Session tokens (`st_`) and API tokens (`lt_`) are hashed and looked up
//! by digest. A token with no stored record takes the dummy verification
//! path so lookups for absent and present tokens cost about the same.
//! Every rejection except a storage failure reaches the caller as the same
//! opaque `Authentication` error.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use licensehub_core::error::{AppError, ErrorKind};
use licensehub_core::traits::Clock;
use licensehub_database::store::{Store, UnitOfWork};
use licensehub_entity::identity::Identity;
use licensehub_entity::scope::ScopeSet;

use crate::rbac::ScopeCatalog;
use crate::token::{DummyVerifier, TokenKind, digests_match, hash_token};

/// Why a credential was rejected. Only logged; never shown to the caller.
#[derive(Debug, Error)]
pub enum AuthFailure {
    /// No bearer credential was presented.
    #[error("credential missing")]
    CredentialMissing,
    /// Unknown prefix, unknown digest, revoked session or inactive API token.
    #[error("credential invalid")]
    CredentialInvalid,
    /// The credential is past its expiry.
    #[error("credential expired")]
    CredentialExpired,
    /// The owning identity is deactivated.
    #[error("identity inactive")]
    IdentityInactive,
    /// The store failed; the caller may retry.
    #[error("storage failure: {0}")]
    Storage(#[source] AppError),
}

impl AuthFailure {
    /// Short machine-readable reason for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "missing",
            Self::CredentialInvalid => "invalid",
            Self::CredentialExpired => "expired",
            Self::IdentityInactive => "identity_inactive",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<AppError> for AuthFailure {
    fn from(err: AppError) -> Self {
        Self::Storage(err)
    }
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::Storage(err) if err.kind == ErrorKind::Storage => err,
            AuthFailure::Storage(err) => {
                AppError::with_source(ErrorKind::Storage, "Credential store failure", err)
            }
            _ => AppError::invalid_credential(),
        }
    }
}

/// The credential a principal authenticated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// A login session.
    Session {
        /// Session ID.
        id: Uuid,
    },
    /// A scoped API token.
    ApiToken {
        /// Token ID.
        id: Uuid,
    },
}

/// A verified caller.
#[derive(Debug, Clone)]
pub struct Principal {
    /// The authenticated identity.
    pub identity: Identity,
    /// Effective scopes for this request.
    pub scopes: ScopeSet,
    /// The credential used.
    pub credential: CredentialKind,
}

/// Verifies bearer credentials against the credential store.
#[derive(Debug, Clone)]
pub struct TokenAuthenticator {
    store: Arc<dyn Store>,
    catalog: Arc<ScopeCatalog>,
    clock: Arc<dyn Clock>,
    dummy: DummyVerifier,
}

impl TokenAuthenticator {
    /// Creates a new authenticator.
    pub fn new(
        store: Arc<dyn Store>,
        catalog: Arc<ScopeCatalog>,
        clock: Arc<dyn Clock>,
        dummy_verify_rounds: u32,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            dummy: DummyVerifier::new(dummy_verify_rounds),
        }
    }

    /// Verify a bearer credential, collapsing every rejection into the opaque error.
    pub async fn verify(&self, bearer: Option<&str>) -> Result<Principal, AppError> {
        self.authenticate(bearer).await.map_err(AppError::from)
    }

    /// Verify a bearer credential, reporting why it was rejected.
    pub async fn authenticate(&self, bearer: Option<&str>) -> Result<Principal, AuthFailure> {
        let result = self.authenticate_inner(bearer).await;
        if let Err(failure) = &result {
            warn!(reason = failure.reason(), "Rejected bearer credential");
        }
        result
    }

    async fn authenticate_inner(&self, bearer: Option<&str>) -> Result<Principal, AuthFailure> {
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthFailure::CredentialMissing)?;
        let digest = hash_token(token);

        let Some(kind) = TokenKind::of(token) else {
            self.dummy.verify(&digest);
            return Err(AuthFailure::CredentialInvalid);
        };

        let mut uow = self.store.begin().await?;
        let principal = match kind {
            TokenKind::Session => self.verify_session(uow.as_mut(), &digest).await?,
            TokenKind::Api => self.verify_api_token(uow.as_mut(), &digest).await?,
        };
        uow.commit().await?;

        debug!(identity_id = %principal.identity.id, "Authenticated bearer credential");
        Ok(principal)
    }

    async fn verify_session(
        &self,
        uow: &mut dyn UnitOfWork,
        digest: &str,
    ) -> Result<Principal, AuthFailure> {
        let now = self.clock.now();
        let Some(session) = uow.find_session_by_hash(digest).await? else {
            self.dummy.verify(digest);
            return Err(AuthFailure::CredentialInvalid);
        };
        if !digests_match(&session.token_hash, digest) || session.is_revoked {
            return Err(AuthFailure::CredentialInvalid);
        }
        if session.is_expired_at(now) {
            return Err(AuthFailure::CredentialExpired);
        }

        let identity = self.load_active_identity(uow, session.identity_id).await?;
        let scopes = self.catalog.scopes_for_identity(&identity);
        uow.touch_session(session.id, now).await?;

        Ok(Principal {
            identity,
            scopes,
            credential: CredentialKind::Session { id: session.id },
        })
    }

    async fn verify_api_token(
        &self,
        uow: &mut dyn UnitOfWork,
        digest: &str,
    ) -> Result<Principal, AuthFailure> {
        let now = self.clock.now();
        let Some(token) = uow.find_api_token_by_hash(digest).await? else {
            self.dummy.verify(digest);
            return Err(AuthFailure::CredentialInvalid);
        };
        if !digests_match(&token.token_hash, digest) || !token.is_active {
            return Err(AuthFailure::CredentialInvalid);
        }
        if token.is_expired_at(now) {
            return Err(AuthFailure::CredentialExpired);
        }

        let identity = self.load_active_identity(uow, token.identity_id).await?;
        // Role changes since issue narrow what the token can do.
        let scopes = token
            .scopes
            .intersection(&self.catalog.scopes_for_identity(&identity));
        uow.touch_api_token(token.id, now).await?;

        Ok(Principal {
            identity,
            scopes,
            credential: CredentialKind::ApiToken { id: token.id },
        })
    }

    async fn load_active_identity(
        &self,
        uow: &mut dyn UnitOfWork,
        identity_id: Uuid,
    ) -> Result<Identity, AuthFailure> {
        let identity = uow
            .find_identity(identity_id)
            .await?
            .ok_or(AuthFailure::CredentialInvalid)?;
        if !identity.is_active {
            return Err(AuthFailure::IdentityInactive);
        }
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use chrono::Duration;

    use super::*;
    use crate::testing::AuthHarness;
    use licensehub_entity::identity::SystemRole;
    use licensehub_entity::scope::Scope;

    #[tokio::test]
    async fn test_session_token_resolves_role_scopes() {
        let h = AuthHarness::new();
        let token = h.login_new("alice").await;
        let principal = h.principal(&token).await;
        assert_eq!(principal.identity.username, "alice");
        assert!(principal.scopes.contains(Scope::LicenseWrite));
        assert!(!principal.scopes.contains(Scope::UserManagement));
        assert!(matches!(principal.credential, CredentialKind::Session { .. }));
    }

    #[tokio::test]
    async fn test_missing_and_malformed_credentials() {
        let h = AuthHarness::new();
        assert!(matches!(
            h.authenticator.authenticate(None).await,
            Err(AuthFailure::CredentialMissing)
        ));
        assert!(matches!(
            h.authenticator.authenticate(Some("  ")).await,
            Err(AuthFailure::CredentialMissing)
        ));
        assert!(matches!(
            h.authenticator.authenticate(Some("Bearer abc")).await,
            Err(AuthFailure::CredentialInvalid)
        ));
        assert!(matches!(
            h.authenticator.authenticate(Some("st_doesnotexist")).await,
            Err(AuthFailure::CredentialInvalid)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_opaque_at_the_boundary() {
        let h = AuthHarness::new();
        let token = h.login_new("bob").await;
        h.clock.advance(Duration::minutes(31));

        assert!(matches!(
            h.authenticator.authenticate(Some(&token)).await,
            Err(AuthFailure::CredentialExpired)
        ));
        let err = h.authenticator.verify(Some(&token)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Invalid token");
    }

    #[tokio::test]
    async fn test_session_touch_updates_last_activity() {
        let h = AuthHarness::new();
        let token = h.login_new("carol").await;
        h.clock.advance(Duration::minutes(5));
        h.principal(&token).await;

        let mut uow = h.store.begin().await.unwrap();
        let session = uow
            .find_session_by_hash(&hash_token(&token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.last_activity, h.clock.now());
    }

    #[tokio::test]
    async fn test_rejected_credential_leaves_no_side_effect() {
        let h = AuthHarness::new();
        let token = h.login_new("dave").await;
        let before = {
            let mut uow = h.store.begin().await.unwrap();
            uow.find_session_by_hash(&hash_token(&token))
                .await
                .unwrap()
                .unwrap()
                .last_activity
        };
        h.clock.advance(Duration::hours(1));
        assert!(h.authenticator.authenticate(Some(&token)).await.is_err());

        let mut uow = h.store.begin().await.unwrap();
        let after = uow
            .find_session_by_hash(&hash_token(&token))
            .await
            .unwrap()
            .unwrap()
            .last_activity;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_inactive_identity_is_rejected() {
        let h = AuthHarness::new();
        let token = h.login_new("erin").await;
        let principal = h.principal(&token).await;
        {
            let mut uow = h.store.begin().await.unwrap();
            uow.set_identity_active(principal.identity.id, false, h.clock.now())
                .await
                .unwrap();
            uow.commit().await.unwrap();
        }
        assert!(matches!(
            h.authenticator.authenticate(Some(&token)).await,
            Err(AuthFailure::IdentityInactive)
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_is_retryable_not_opaque() {
        let h = AuthHarness::new();
        let token = h.login_new("frank").await;
        h.store.set_unavailable(true);

        let err = h.authenticator.verify(Some(&token)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_api_token_carries_requested_scopes() {
        let h = AuthHarness::new();
        let session = h.login_new("grace").await;
        let principal = h.principal(&session).await;
        let requested: ScopeSet = [Scope::LicenseRead, Scope::Validation].into_iter().collect();
        let issued = h
            .tokens
            .issue(&principal, "ci", requested.clone(), None)
            .await
            .unwrap();

        let via_token = h.principal(&issued.token).await;
        assert_eq!(via_token.scopes, requested);
        assert!(matches!(via_token.credential, CredentialKind::ApiToken { .. }));
    }

    #[tokio::test]
    async fn test_demotion_strips_scopes_from_existing_api_tokens() {
        let h = AuthHarness::new();
        let session = h.login_new("ivan").await;
        let identity = h.principal(&session).await.identity;
        let set_system_role = |role: SystemRole| {
            let store = h.store.clone();
            let now = h.clock.now();
            let identity = identity.clone();
            async move {
                let mut uow = store.begin().await.unwrap();
                uow.update_identity_roles(identity.id, identity.business_role, role, now)
                    .await
                    .unwrap();
                uow.commit().await.unwrap();
            }
        };

        set_system_role(SystemRole::SystemAdmin).await;
        let admin = h.principal(&session).await;
        assert!(admin.scopes.contains(Scope::UserManagement));
        let requested: ScopeSet = [Scope::UserManagement, Scope::LicenseRead]
            .into_iter()
            .collect();
        let issued = h.tokens.issue(&admin, "ops", requested, None).await.unwrap();
        let before = h.principal(&issued.token).await;
        assert!(before.scopes.contains(Scope::UserManagement));

        set_system_role(SystemRole::User).await;
        let after = h.principal(&issued.token).await;
        assert!(!after.scopes.contains(Scope::UserManagement));
        assert!(after.scopes.contains(Scope::LicenseRead));
    }

    #[tokio::test]
    async fn test_not_found_and_rejected_branches_cost_about_the_same() {
        let h = AuthHarness::new();
        let token = h.login_new("heidi").await;
        let principal = h.principal(&token).await;
        h.sessions.logout(&principal).await.unwrap();

        let missing = "st_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let rounds = 200;

        let start = Instant::now();
        for _ in 0..rounds {
            let _ = h.authenticator.authenticate(Some(missing)).await;
        }
        let not_found = start.elapsed();

        let start = Instant::now();
        for _ in 0..rounds {
            let _ = h.authenticator.authenticate(Some(&token)).await;
        }
        let rejected = start.elapsed();

        let (slow, fast) = if not_found > rejected {
            (not_found, rejected)
        } else {
            (rejected, not_found)
        };
        assert!(
            slow.as_nanos() < fast.as_nanos().max(1) * 10,
            "not found: {not_found:?}, rejected: {rejected:?}"
        );
    }
}
