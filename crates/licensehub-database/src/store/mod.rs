//! Transactional persistence traits.
//!
//! A [`UnitOfWork`] is a single transaction. Reads through `lock_*` methods
//! serialize concurrent units of work on the same row; `commit` publishes
//! every write, and dropping the handle without committing discards them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

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

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Source of units of work.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Open a new unit of work.
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}

/// A transaction spanning every entity the core touches.
#[async_trait]
pub trait UnitOfWork:
    IdentityStore + CredentialStore + ApplicationStore + LicenseStore + ActivationStore + OfflineStore + Send
{
    /// Publish every write made through this unit of work.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Identity persistence.
#[async_trait]
pub trait IdentityStore: Send {
    /// Insert a new identity. Duplicate username or email is a conflict.
    async fn insert_identity(
        &mut self,
        data: CreateIdentity,
        now: DateTime<Utc>,
    ) -> AppResult<Identity>;

    /// Find an identity by ID.
    async fn find_identity(&mut self, id: Uuid) -> AppResult<Option<Identity>>;

    /// Find an identity by username.
    async fn find_identity_by_username(&mut self, username: &str) -> AppResult<Option<Identity>>;

    /// Replace the password hash.
    async fn update_identity_password(
        &mut self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Replace both roles.
    async fn update_identity_roles(
        &mut self,
        id: Uuid,
        business_role: BusinessRole,
        system_role: SystemRole,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Set the active flag.
    async fn set_identity_active(
        &mut self,
        id: Uuid,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Session and API token persistence, keyed by token hash.
#[async_trait]
pub trait CredentialStore: Send {
    /// Insert a new session.
    async fn insert_session(&mut self, data: CreateSession) -> AppResult<SessionCredential>;

    /// Find a session by token hash.
    async fn find_session_by_hash(&mut self, token_hash: &str)
    -> AppResult<Option<SessionCredential>>;

    /// Record activity on a session.
    async fn touch_session(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Revoke a single session.
    async fn revoke_session(&mut self, id: Uuid) -> AppResult<()>;

    /// Revoke every session of an identity, returning how many were live.
    async fn revoke_sessions_for_identity(&mut self, identity_id: Uuid) -> AppResult<u64>;

    /// Insert a new API token.
    async fn insert_api_token(&mut self, data: CreateApiToken) -> AppResult<ScopedCredential>;

    /// Find an API token by ID.
    async fn find_api_token(&mut self, id: Uuid) -> AppResult<Option<ScopedCredential>>;

    /// Find an API token by token hash.
    async fn find_api_token_by_hash(
        &mut self,
        token_hash: &str,
    ) -> AppResult<Option<ScopedCredential>>;

    /// List the API tokens of an identity, newest first.
    async fn list_api_tokens(&mut self, identity_id: Uuid) -> AppResult<Vec<ScopedCredential>>;

    /// Apply holder-editable changes to an API token.
    async fn update_api_token(
        &mut self,
        id: Uuid,
        changes: UpdateApiToken,
    ) -> AppResult<ScopedCredential>;

    /// Record use of an API token.
    async fn touch_api_token(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Delete an API token. Returns whether a row was removed.
    async fn delete_api_token(&mut self, id: Uuid) -> AppResult<bool>;
}

/// Application persistence.
#[async_trait]
pub trait ApplicationStore: Send {
    /// Insert a new application.
    async fn insert_application(
        &mut self,
        data: CreateApplication,
        now: DateTime<Utc>,
    ) -> AppResult<Application>;

    /// Find an application by ID.
    async fn find_application(&mut self, id: Uuid) -> AppResult<Option<Application>>;
}

/// License persistence.
#[async_trait]
pub trait LicenseStore: Send {
    /// Insert a new license. Duplicate key hash is a conflict.
    async fn insert_license(&mut self, data: CreateLicense) -> AppResult<License>;

    /// Find a license by ID without locking it.
    async fn find_license(&mut self, id: Uuid) -> AppResult<Option<License>>;

    /// Find and lock a license by ID.
    async fn lock_license(&mut self, id: Uuid) -> AppResult<Option<License>>;

    /// Find and lock a license by key hash.
    async fn lock_license_by_key_hash(&mut self, key_hash: &str) -> AppResult<Option<License>>;

    /// List the licenses of an application, newest first.
    async fn list_licenses_by_application(
        &mut self,
        application_id: Uuid,
    ) -> AppResult<Vec<License>>;

    /// Write back the mutable fields of a license.
    ///
    /// Rejects a record whose counter falls outside `0..=max_activations`.
    async fn save_license(&mut self, license: &License) -> AppResult<()>;

    /// Delete a license together with its activations, request forms and
    /// activation codes. Returns whether a row was removed.
    async fn delete_license(&mut self, id: Uuid) -> AppResult<bool>;
}

/// Activation persistence.
#[async_trait]
pub trait ActivationStore: Send {
    /// Find an activation by ID.
    async fn find_activation(&mut self, id: Uuid) -> AppResult<Option<Activation>>;

    /// Find the active activation of a machine on a license.
    async fn find_active_activation(
        &mut self,
        license_id: Uuid,
        machine_fingerprint: &str,
    ) -> AppResult<Option<Activation>>;

    /// Insert a new active activation.
    async fn insert_activation(&mut self, data: CreateActivation) -> AppResult<Activation>;

    /// Update the heartbeat of an activation.
    async fn touch_activation(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Delete an activation. Returns whether a row was removed.
    async fn delete_activation(&mut self, id: Uuid) -> AppResult<bool>;

    /// List the activations of a license, oldest first.
    async fn list_activations(&mut self, license_id: Uuid) -> AppResult<Vec<Activation>>;

    /// List the activations on every license of every application an
    /// identity owns, newest first.
    async fn list_activations_for_owner(&mut self, owner_id: Uuid) -> AppResult<Vec<Activation>>;
}

/// Offline request form and activation code persistence.
#[async_trait]
pub trait OfflineStore: Send {
    /// Insert a new request form. Duplicate request code is a conflict.
    async fn insert_request_form(
        &mut self,
        data: CreateRequestForm,
    ) -> AppResult<ActivationRequestForm>;

    /// Find a request form by code without locking it.
    async fn find_request_form(
        &mut self,
        request_code: &str,
    ) -> AppResult<Option<ActivationRequestForm>>;

    /// Find a request form by ID.
    async fn find_request_form_by_id(
        &mut self,
        id: Uuid,
    ) -> AppResult<Option<ActivationRequestForm>>;

    /// List the request forms on licenses an identity owns, newest first.
    async fn list_request_forms_for_owner(
        &mut self,
        owner_id: Uuid,
    ) -> AppResult<Vec<ActivationRequestForm>>;

    /// Find and lock a request form by code.
    async fn lock_request_form(
        &mut self,
        request_code: &str,
    ) -> AppResult<Option<ActivationRequestForm>>;

    /// Mark a request form completed.
    async fn complete_request_form(
        &mut self,
        id: Uuid,
        activation_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Insert a new activation code. Duplicate code is a conflict.
    async fn insert_offline_code(
        &mut self,
        data: CreateOfflineCode,
    ) -> AppResult<OfflineActivationCode>;

    /// Find and lock an activation code by value.
    async fn lock_offline_code(&mut self, code: &str) -> AppResult<Option<OfflineActivationCode>>;

    /// Mark an activation code used.
    async fn mark_offline_code_used(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;
}
