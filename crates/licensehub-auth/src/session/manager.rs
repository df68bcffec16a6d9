//! Session lifecycle manager.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use licensehub_core::config::AuthConfig;
use licensehub_core::error::{AppError, ErrorKind};
use licensehub_core::traits::{Clock, RandomSource};
use licensehub_database::store::Store;
use licensehub_entity::credential::{CreateSession, SessionCredential};
use licensehub_entity::identity::{BusinessRole, CreateIdentity, Identity, SystemRole};
use licensehub_entity::scope::Scope;

use crate::authenticator::{CredentialKind, Principal};
use crate::password::{PasswordHasher, PasswordValidator};
use crate::rbac::ScopeEnforcer;
use crate::token::{TokenKind, generate_token, hash_token};

/// Input for registering a new identity.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterIdentity {
    /// Desired username: letters, digits, `_` and `-`.
    #[validate(length(min = 1, max = 100), custom(function = "validate_username"))]
    pub username: String,
    /// Email address.
    #[validate(email, length(max = 255))]
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Plaintext password.
    pub password: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    /// The plaintext session token. Returned exactly once.
    pub token: String,
    /// The created session.
    pub session: SessionCredential,
    /// The authenticated identity.
    pub identity: Identity,
}

/// Manages identities and their login sessions.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: Arc<dyn Store>,
    hasher: Arc<PasswordHasher>,
    validator: PasswordValidator,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    config: AuthConfig,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset")
            .with_message("Username may only contain letters, digits, _ and -".into()))
    }
}

fn bad_login() -> AppError {
    AppError::new(ErrorKind::Authentication, "Invalid username or password")
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<PasswordHasher>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            hasher,
            validator: PasswordValidator::new(&config),
            clock,
            random,
            config,
        }
    }

    /// Registers a new identity with the default `user`/`user` roles.
    pub async fn register(&self, mut input: RegisterIdentity) -> Result<Identity, AppError> {
        input.username = input.username.trim().to_string();
        input.email = input.email.trim().to_string();
        input
            .validate()
            .map_err(|e| AppError::validation(format!("Invalid registration: {e}")))?;
        self.validator.validate(&input.password)?;
        let password_hash = self.hasher.hash_password(&input.password)?;

        let mut uow = self.store.begin().await?;
        let identity = uow
            .insert_identity(
                CreateIdentity {
                    username: input.username,
                    email: input.email,
                    full_name: input.full_name.trim().to_string(),
                    password_hash,
                    business_role: BusinessRole::User,
                    system_role: SystemRole::User,
                },
                self.clock.now(),
            )
            .await?;
        uow.commit().await?;

        info!(identity_id = %identity.id, username = %identity.username, "Identity registered");
        Ok(identity)
    }

    /// Verifies a username and password and opens a session.
    ///
    /// Unknown and inactive identities still pay for a full Argon2
    /// verification against a dummy hash.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AppError> {
        let mut uow = self.store.begin().await?;
        let identity = match uow.find_identity_by_username(username).await? {
            Some(identity) if identity.is_active => identity,
            _ => {
                self.hasher.dummy_verify(password);
                warn!(username = %username, "Login rejected: unknown or inactive identity");
                return Err(bad_login());
            }
        };

        if !self
            .hasher
            .verify_password(password, &identity.password_hash)?
        {
            warn!(identity_id = %identity.id, "Login rejected: wrong password");
            return Err(bad_login());
        }

        let now = self.clock.now();
        let token = generate_token(self.random.as_ref(), TokenKind::Session);
        let session = uow
            .insert_session(CreateSession {
                identity_id: identity.id,
                token_hash: hash_token(&token),
                created_at: now,
                expires_at: now + Duration::minutes(self.config.session_ttl_minutes),
            })
            .await?;
        uow.commit().await?;

        info!(identity_id = %identity.id, session_id = %session.id, "Session opened");
        Ok(LoginResult {
            token,
            session,
            identity,
        })
    }

    /// Revokes the session the principal authenticated with.
    pub async fn logout(&self, principal: &Principal) -> Result<(), AppError> {
        let CredentialKind::Session { id } = principal.credential else {
            return Err(AppError::validation(
                "Only session credentials can be logged out",
            ));
        };
        let mut uow = self.store.begin().await?;
        uow.revoke_session(id).await?;
        uow.commit().await?;
        info!(identity_id = %principal.identity.id, session_id = %id, "Session revoked");
        Ok(())
    }

    /// Changes an identity's password after checking the current one.
    pub async fn change_password(
        &self,
        identity_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        self.validator.validate(new_password)?;
        self.validator
            .validate_not_same(current_password, new_password)?;

        let mut uow = self.store.begin().await?;
        let identity = uow
            .find_identity(identity_id)
            .await?
            .ok_or_else(|| AppError::not_found("Identity not found"))?;
        if !self
            .hasher
            .verify_password(current_password, &identity.password_hash)?
        {
            return Err(AppError::new(
                ErrorKind::Authentication,
                "Current password is incorrect",
            ));
        }

        let hash = self.hasher.hash_password(new_password)?;
        uow.update_identity_password(identity_id, &hash, self.clock.now())
            .await?;
        uow.commit().await?;
        info!(identity_id = %identity_id, "Password changed");
        Ok(())
    }

    /// Sets the business role of another identity. Requires `user:management`.
    pub async fn update_business_role(
        &self,
        caller: &Principal,
        target_id: Uuid,
        role: BusinessRole,
    ) -> Result<Identity, AppError> {
        self.update_roles(caller, target_id, Some(role), None).await
    }

    /// Sets the system role of another identity. Requires `user:management`.
    pub async fn update_system_role(
        &self,
        caller: &Principal,
        target_id: Uuid,
        role: SystemRole,
    ) -> Result<Identity, AppError> {
        self.update_roles(caller, target_id, None, Some(role)).await
    }

    async fn update_roles(
        &self,
        caller: &Principal,
        target_id: Uuid,
        business: Option<BusinessRole>,
        system: Option<SystemRole>,
    ) -> Result<Identity, AppError> {
        ScopeEnforcer::require(&caller.scopes, &Scope::UserManagement.into())?;

        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let mut target = uow
            .find_identity(target_id)
            .await?
            .ok_or_else(|| AppError::not_found("Identity not found"))?;
        target.business_role = business.unwrap_or(target.business_role);
        target.system_role = system.unwrap_or(target.system_role);
        target.updated_at = now;
        uow.update_identity_roles(target.id, target.business_role, target.system_role, now)
            .await?;
        uow.commit().await?;

        info!(
            caller_id = %caller.identity.id,
            identity_id = %target.id,
            business_role = %target.business_role,
            system_role = %target.system_role,
            "Identity roles updated"
        );
        Ok(target)
    }

    /// Activates or deactivates an identity. Requires `user:management`.
    ///
    /// Deactivation also revokes every open session of the identity.
    pub async fn set_active(
        &self,
        caller: &Principal,
        target_id: Uuid,
        is_active: bool,
    ) -> Result<Identity, AppError> {
        ScopeEnforcer::require(&caller.scopes, &Scope::UserManagement.into())?;
        if caller.identity.id == target_id && !is_active {
            return Err(AppError::validation("Cannot deactivate your own identity"));
        }

        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let mut target = uow
            .find_identity(target_id)
            .await?
            .ok_or_else(|| AppError::not_found("Identity not found"))?;
        uow.set_identity_active(target_id, is_active, now).await?;
        let revoked = if is_active {
            0
        } else {
            uow.revoke_sessions_for_identity(target_id).await?
        };
        uow.commit().await?;

        target.is_active = is_active;
        target.updated_at = now;
        info!(
            caller_id = %caller.identity.id,
            identity_id = %target_id,
            is_active,
            revoked_sessions = revoked,
            "Identity status changed"
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AuthHarness, PASSWORD};

    async fn make_admin(h: &AuthHarness, identity_id: Uuid) {
        let mut uow = h.store.begin().await.unwrap();
        uow.update_identity_roles(
            identity_id,
            BusinessRole::User,
            SystemRole::SystemAdmin,
            h.clock.now(),
        )
        .await
        .unwrap();
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_short_passwords() {
        let h = AuthHarness::new();
        h.login_new("alice").await;

        let dup = h
            .sessions
            .register(RegisterIdentity {
                username: "alice".into(),
                email: "other@example.com".into(),
                full_name: "Alice Again".into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap_err();
        assert_eq!(dup.kind, ErrorKind::Conflict);

        let short = h
            .sessions
            .register(RegisterIdentity {
                username: "zed".into(),
                email: "zed@example.com".into(),
                full_name: "Zed".into(),
                password: "short".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(short.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_username_and_email() {
        let h = AuthHarness::new();
        let register = |username: &str, email: &str| {
            h.sessions.register(RegisterIdentity {
                username: username.into(),
                email: email.into(),
                full_name: "Someone".into(),
                password: PASSWORD.into(),
            })
        };

        for username in ["bad name", "drop;table", "", "ünïcode"] {
            let err = register(username, "someone@example.com").await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "{username:?}");
        }
        for email in ["not-an-email", "a@", "@example.com", "two@@example.com"] {
            let err = register("someone", email).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "{email:?}");
        }

        let identity = register("  build_bot-2 ", " bot@example.com ").await.unwrap();
        assert_eq!(identity.username, "build_bot-2");
        assert_eq!(identity.email, "bot@example.com");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let h = AuthHarness::new();
        h.login_new("bob").await;

        let wrong_password = h.sessions.login("bob", "not-the-password").await.unwrap_err();
        let unknown_user = h.sessions.login("nobody", PASSWORD).await.unwrap_err();
        assert_eq!(wrong_password.kind, ErrorKind::Authentication);
        assert_eq!(wrong_password.message, unknown_user.message);
    }

    #[tokio::test]
    async fn test_login_issues_prefixed_session_with_ttl() {
        let h = AuthHarness::new();
        h.login_new("carol").await;
        let result = h.sessions.login("carol", PASSWORD).await.unwrap();
        assert!(result.token.starts_with("st_"));
        assert_eq!(
            result.session.expires_at - result.session.created_at,
            Duration::minutes(30)
        );
        assert_ne!(result.session.token_hash, result.token);
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let h = AuthHarness::new();
        let token = h.login_new("dave").await;
        let principal = h.principal(&token).await;
        h.sessions.logout(&principal).await.unwrap();
        assert!(h.authenticator.authenticate(Some(&token)).await.is_err());
    }

    #[tokio::test]
    async fn test_change_password() {
        let h = AuthHarness::new();
        let token = h.login_new("erin").await;
        let id = h.principal(&token).await.identity.id;

        let err = h
            .sessions
            .change_password(id, "wrong-current", "brand-new-password")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);

        h.sessions
            .change_password(id, PASSWORD, "brand-new-password")
            .await
            .unwrap();
        assert!(h.sessions.login("erin", PASSWORD).await.is_err());
        assert!(h.sessions.login("erin", "brand-new-password").await.is_ok());
    }

    #[tokio::test]
    async fn test_role_updates_require_user_management() {
        let h = AuthHarness::new();
        let caller_token = h.login_new("frank").await;
        let target_token = h.login_new("grace").await;
        let caller = h.principal(&caller_token).await;
        let target = h.principal(&target_token).await;

        let err = h
            .sessions
            .update_system_role(&caller, target.identity.id, SystemRole::SystemAdmin)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);

        make_admin(&h, caller.identity.id).await;
        let caller = h.principal(&caller_token).await;
        let updated = h
            .sessions
            .update_system_role(&caller, target.identity.id, SystemRole::SystemAdmin)
            .await
            .unwrap();
        assert!(updated.is_system_admin());

        let promoted = h.principal(&target_token).await;
        assert!(promoted.scopes.contains(Scope::UserManagement));
    }

    #[tokio::test]
    async fn test_deactivation_revokes_sessions() {
        let h = AuthHarness::new();
        let admin_token = h.login_new("heidi").await;
        let target_token = h.login_new("ivan").await;
        let admin_id = h.principal(&admin_token).await.identity.id;
        make_admin(&h, admin_id).await;
        let admin = h.principal(&admin_token).await;
        let target = h.principal(&target_token).await;

        h.sessions
            .set_active(&admin, target.identity.id, false)
            .await
            .unwrap();
        assert!(h.authenticator.authenticate(Some(&target_token)).await.is_err());
        assert!(h.sessions.login("ivan", PASSWORD).await.is_err());

        let own = h.sessions.set_active(&admin, admin_id, false).await.unwrap_err();
        assert_eq!(own.kind, ErrorKind::Validation);
    }
}
