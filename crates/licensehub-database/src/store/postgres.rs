//! PostgreSQL store.
//!
//! Each unit of work is one sqlx transaction. `lock_*` reads use
//! `SELECT ... FOR UPDATE`; dropping the transaction rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use licensehub_core::error::{AppError, ErrorKind};
use licensehub_core::result::AppResult;
use licensehub_entity::activation::{Activation, CreateActivation};
use licensehub_entity::application::{Application, CreateApplication};
use licensehub_entity::credential::{
    CreateApiToken, CreateSession, ScopedCredential, SessionCredential, UpdateApiToken,
};
use licensehub_entity::identity::{BusinessRole, CreateIdentity, Identity, SystemRole};
use licensehub_entity::license::{CreateLicense, License};
use licensehub_entity::offline::{
    ActivationRequestForm, CreateOfflineCode, CreateRequestForm, OfflineActivationCode,
};

use super::{
    ActivationStore, ApplicationStore, CredentialStore, IdentityStore, LicenseStore, OfflineStore,
    Store, UnitOfWork,
};
use crate::connection::DatabasePool;
use crate::repositories::{
    ActivationRepository, ApplicationRepository, CredentialRepository, IdentityRepository,
    LicenseRepository, OfflineRepository,
};

/// A [`Store`] backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<DatabasePool> for PgStore {
    fn from(pool: DatabasePool) -> Self {
        Self::new(pool.into_pool())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to begin transaction", e)
        })?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// A unit of work over one PostgreSQL transaction.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUnitOfWork").finish_non_exhaustive()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to commit transaction", e)
        })
    }
}

#[async_trait]
impl IdentityStore for PgUnitOfWork {
    async fn insert_identity(
        &mut self,
        data: CreateIdentity,
        now: DateTime<Utc>,
    ) -> AppResult<Identity> {
        IdentityRepository::create(&mut self.tx, data, now).await
    }

    async fn find_identity(&mut self, id: Uuid) -> AppResult<Option<Identity>> {
        IdentityRepository::find_by_id(&mut self.tx, id).await
    }

    async fn find_identity_by_username(&mut self, username: &str) -> AppResult<Option<Identity>> {
        IdentityRepository::find_by_username(&mut self.tx, username).await
    }

    async fn update_identity_password(
        &mut self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        IdentityRepository::update_password(&mut self.tx, id, password_hash, now).await
    }

    async fn update_identity_roles(
        &mut self,
        id: Uuid,
        business_role: BusinessRole,
        system_role: SystemRole,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        IdentityRepository::update_roles(&mut self.tx, id, business_role, system_role, now).await
    }

    async fn set_identity_active(
        &mut self,
        id: Uuid,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        IdentityRepository::set_active(&mut self.tx, id, is_active, now).await
    }
}

#[async_trait]
impl CredentialStore for PgUnitOfWork {
    async fn insert_session(&mut self, data: CreateSession) -> AppResult<SessionCredential> {
        CredentialRepository::create_session(&mut self.tx, data).await
    }

    async fn find_session_by_hash(
        &mut self,
        token_hash: &str,
    ) -> AppResult<Option<SessionCredential>> {
        CredentialRepository::find_session_by_hash(&mut self.tx, token_hash).await
    }

    async fn touch_session(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        CredentialRepository::touch_session(&mut self.tx, id, now).await
    }

    async fn revoke_session(&mut self, id: Uuid) -> AppResult<()> {
        CredentialRepository::revoke_session(&mut self.tx, id).await
    }

    async fn revoke_sessions_for_identity(&mut self, identity_id: Uuid) -> AppResult<u64> {
        CredentialRepository::revoke_sessions_for_identity(&mut self.tx, identity_id).await
    }

    async fn insert_api_token(&mut self, data: CreateApiToken) -> AppResult<ScopedCredential> {
        CredentialRepository::create_api_token(&mut self.tx, data).await
    }

    async fn find_api_token(&mut self, id: Uuid) -> AppResult<Option<ScopedCredential>> {
        CredentialRepository::find_api_token(&mut self.tx, id).await
    }

    async fn find_api_token_by_hash(
        &mut self,
        token_hash: &str,
    ) -> AppResult<Option<ScopedCredential>> {
        CredentialRepository::find_api_token_by_hash(&mut self.tx, token_hash).await
    }

    async fn list_api_tokens(&mut self, identity_id: Uuid) -> AppResult<Vec<ScopedCredential>> {
        CredentialRepository::list_api_tokens(&mut self.tx, identity_id).await
    }

    async fn update_api_token(
        &mut self,
        id: Uuid,
        changes: UpdateApiToken,
    ) -> AppResult<ScopedCredential> {
        CredentialRepository::update_api_token(&mut self.tx, id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("API token not found"))
    }

    async fn touch_api_token(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        CredentialRepository::touch_api_token(&mut self.tx, id, now).await
    }

    async fn delete_api_token(&mut self, id: Uuid) -> AppResult<bool> {
        CredentialRepository::delete_api_token(&mut self.tx, id).await
    }
}

#[async_trait]
impl ApplicationStore for PgUnitOfWork {
    async fn insert_application(
        &mut self,
        data: CreateApplication,
        now: DateTime<Utc>,
    ) -> AppResult<Application> {
        ApplicationRepository::create(&mut self.tx, data, now).await
    }

    async fn find_application(&mut self, id: Uuid) -> AppResult<Option<Application>> {
        ApplicationRepository::find_by_id(&mut self.tx, id).await
    }
}

#[async_trait]
impl LicenseStore for PgUnitOfWork {
    async fn insert_license(&mut self, data: CreateLicense) -> AppResult<License> {
        LicenseRepository::create(&mut self.tx, data).await
    }

    async fn find_license(&mut self, id: Uuid) -> AppResult<Option<License>> {
        LicenseRepository::find_by_id(&mut self.tx, id).await
    }

    async fn lock_license(&mut self, id: Uuid) -> AppResult<Option<License>> {
        LicenseRepository::lock_by_id(&mut self.tx, id).await
    }

    async fn lock_license_by_key_hash(&mut self, key_hash: &str) -> AppResult<Option<License>> {
        LicenseRepository::lock_by_key_hash(&mut self.tx, key_hash).await
    }

    async fn list_licenses_by_application(
        &mut self,
        application_id: Uuid,
    ) -> AppResult<Vec<License>> {
        LicenseRepository::find_by_application(&mut self.tx, application_id).await
    }

    async fn save_license(&mut self, license: &License) -> AppResult<()> {
        LicenseRepository::save(&mut self.tx, license).await
    }

    async fn delete_license(&mut self, id: Uuid) -> AppResult<bool> {
        LicenseRepository::delete(&mut self.tx, id).await
    }
}

#[async_trait]
impl ActivationStore for PgUnitOfWork {
    async fn find_activation(&mut self, id: Uuid) -> AppResult<Option<Activation>> {
        ActivationRepository::find_by_id(&mut self.tx, id).await
    }

    async fn find_active_activation(
        &mut self,
        license_id: Uuid,
        machine_fingerprint: &str,
    ) -> AppResult<Option<Activation>> {
        ActivationRepository::find_active(&mut self.tx, license_id, machine_fingerprint).await
    }

    async fn insert_activation(&mut self, data: CreateActivation) -> AppResult<Activation> {
        ActivationRepository::create(&mut self.tx, data).await
    }

    async fn touch_activation(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        ActivationRepository::touch(&mut self.tx, id, now).await
    }

    async fn delete_activation(&mut self, id: Uuid) -> AppResult<bool> {
        ActivationRepository::delete(&mut self.tx, id).await
    }

    async fn list_activations(&mut self, license_id: Uuid) -> AppResult<Vec<Activation>> {
        ActivationRepository::find_by_license(&mut self.tx, license_id).await
    }

    async fn list_activations_for_owner(&mut self, owner_id: Uuid) -> AppResult<Vec<Activation>> {
        ActivationRepository::find_by_owner(&mut self.tx, owner_id).await
    }
}

#[async_trait]
impl OfflineStore for PgUnitOfWork {
    async fn insert_request_form(
        &mut self,
        data: CreateRequestForm,
    ) -> AppResult<ActivationRequestForm> {
        OfflineRepository::create_request(&mut self.tx, data).await
    }

    async fn find_request_form(
        &mut self,
        request_code: &str,
    ) -> AppResult<Option<ActivationRequestForm>> {
        OfflineRepository::find_request(&mut self.tx, request_code).await
    }

    async fn find_request_form_by_id(
        &mut self,
        id: Uuid,
    ) -> AppResult<Option<ActivationRequestForm>> {
        OfflineRepository::find_request_by_id(&mut self.tx, id).await
    }

    async fn list_request_forms_for_owner(
        &mut self,
        owner_id: Uuid,
    ) -> AppResult<Vec<ActivationRequestForm>> {
        OfflineRepository::find_requests_by_owner(&mut self.tx, owner_id).await
    }

    async fn lock_request_form(
        &mut self,
        request_code: &str,
    ) -> AppResult<Option<ActivationRequestForm>> {
        OfflineRepository::lock_request(&mut self.tx, request_code).await
    }

    async fn complete_request_form(
        &mut self,
        id: Uuid,
        activation_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        OfflineRepository::complete_request(&mut self.tx, id, activation_code, now).await
    }

    async fn insert_offline_code(
        &mut self,
        data: CreateOfflineCode,
    ) -> AppResult<OfflineActivationCode> {
        OfflineRepository::create_code(&mut self.tx, data).await
    }

    async fn lock_offline_code(&mut self, code: &str) -> AppResult<Option<OfflineActivationCode>> {
        OfflineRepository::lock_code(&mut self.tx, code).await
    }

    async fn mark_offline_code_used(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        OfflineRepository::mark_code_used(&mut self.tx, id, now).await
    }
}
