//! In-memory store.
//!
//! The whole state sits behind one `tokio::sync::Mutex`. A unit of work owns
//! the guard and a staged copy of the state, so units of work are fully
//! serialized and a dropped handle leaves the published state untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use licensehub_core::error::AppError;
use licensehub_core::result::AppResult;
use licensehub_entity::activation::{Activation, ActivationStatus, CreateActivation};
use licensehub_entity::application::{Application, CreateApplication};
use licensehub_entity::credential::{
    CreateApiToken, CreateSession, ScopedCredential, SessionCredential, UpdateApiToken,
};
use licensehub_entity::identity::{BusinessRole, CreateIdentity, Identity, SystemRole};
use licensehub_entity::license::{CreateLicense, License, LicenseStatus};
use licensehub_entity::offline::{
    ActivationRequestForm, CreateOfflineCode, CreateRequestForm, OfflineActivationCode,
    RequestStatus,
};

use super::{
    ActivationStore, ApplicationStore, CredentialStore, IdentityStore, LicenseStore, OfflineStore,
    Store, UnitOfWork,
};

/// Every table of the in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    identities: HashMap<Uuid, Identity>,
    sessions: HashMap<Uuid, SessionCredential>,
    api_tokens: HashMap<Uuid, ScopedCredential>,
    applications: HashMap<Uuid, Application>,
    licenses: HashMap<Uuid, License>,
    activations: HashMap<Uuid, Activation>,
    request_forms: HashMap<Uuid, ActivationRequestForm>,
    offline_codes: HashMap<Uuid, OfflineActivationCode>,
}

/// A [`Store`] kept entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `begin` fail with a storage error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::storage("In-memory store is unavailable"));
        }
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, staged }))
    }
}

/// A unit of work over [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

fn newest_first<T>(rows: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
}

impl MemoryState {
    fn owns_license(&self, owner_id: Uuid, license_id: Uuid) -> bool {
        self.licenses
            .get(&license_id)
            .and_then(|l| self.applications.get(&l.application_id))
            .is_some_and(|a| a.owner_id == owner_id)
    }
}

#[async_trait]
impl IdentityStore for MemoryUnitOfWork {
    async fn insert_identity(
        &mut self,
        data: CreateIdentity,
        now: DateTime<Utc>,
    ) -> AppResult<Identity> {
        let taken = self
            .staged
            .identities
            .values()
            .any(|i| i.username == data.username || i.email == data.email);
        if taken {
            return Err(AppError::conflict("Username or email already exists"));
        }
        let identity = Identity {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            full_name: data.full_name,
            password_hash: data.password_hash,
            business_role: data.business_role,
            system_role: data.system_role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.staged.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_identity(&mut self, id: Uuid) -> AppResult<Option<Identity>> {
        Ok(self.staged.identities.get(&id).cloned())
    }

    async fn find_identity_by_username(&mut self, username: &str) -> AppResult<Option<Identity>> {
        Ok(self
            .staged
            .identities
            .values()
            .find(|i| i.username == username)
            .cloned())
    }

    async fn update_identity_password(
        &mut self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let identity = self
            .staged
            .identities
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Identity not found"))?;
        identity.password_hash = password_hash.to_string();
        identity.updated_at = now;
        Ok(())
    }

    async fn update_identity_roles(
        &mut self,
        id: Uuid,
        business_role: BusinessRole,
        system_role: SystemRole,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let identity = self
            .staged
            .identities
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Identity not found"))?;
        identity.business_role = business_role;
        identity.system_role = system_role;
        identity.updated_at = now;
        Ok(())
    }

    async fn set_identity_active(
        &mut self,
        id: Uuid,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let identity = self
            .staged
            .identities
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Identity not found"))?;
        identity.is_active = is_active;
        identity.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryUnitOfWork {
    async fn insert_session(&mut self, data: CreateSession) -> AppResult<SessionCredential> {
        if self
            .staged
            .sessions
            .values()
            .any(|s| s.token_hash == data.token_hash)
        {
            return Err(AppError::conflict("Session token already exists"));
        }
        let session = SessionCredential {
            id: Uuid::new_v4(),
            identity_id: data.identity_id,
            token_hash: data.token_hash,
            is_revoked: false,
            expires_at: data.expires_at,
            created_at: data.created_at,
            last_activity: data.created_at,
        };
        self.staged.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session_by_hash(
        &mut self,
        token_hash: &str,
    ) -> AppResult<Option<SessionCredential>> {
        Ok(self
            .staged
            .sessions
            .values()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn touch_session(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let session = self
            .staged
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Session not found"))?;
        session.last_activity = now;
        Ok(())
    }

    async fn revoke_session(&mut self, id: Uuid) -> AppResult<()> {
        let session = self
            .staged
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Session not found"))?;
        session.is_revoked = true;
        Ok(())
    }

    async fn revoke_sessions_for_identity(&mut self, identity_id: Uuid) -> AppResult<u64> {
        let mut revoked = 0;
        for session in self
            .staged
            .sessions
            .values_mut()
            .filter(|s| s.identity_id == identity_id && !s.is_revoked)
        {
            session.is_revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn insert_api_token(&mut self, data: CreateApiToken) -> AppResult<ScopedCredential> {
        if self
            .staged
            .api_tokens
            .values()
            .any(|t| t.token_hash == data.token_hash)
        {
            return Err(AppError::conflict("API token already exists"));
        }
        let token = ScopedCredential {
            id: Uuid::new_v4(),
            identity_id: data.identity_id,
            name: data.name,
            token_hash: data.token_hash,
            scopes: data.scopes,
            is_active: true,
            expires_at: data.expires_at,
            last_used_at: None,
            created_at: data.created_at,
        };
        self.staged.api_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_api_token(&mut self, id: Uuid) -> AppResult<Option<ScopedCredential>> {
        Ok(self.staged.api_tokens.get(&id).cloned())
    }

    async fn find_api_token_by_hash(
        &mut self,
        token_hash: &str,
    ) -> AppResult<Option<ScopedCredential>> {
        Ok(self
            .staged
            .api_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn list_api_tokens(&mut self, identity_id: Uuid) -> AppResult<Vec<ScopedCredential>> {
        let mut tokens: Vec<_> = self
            .staged
            .api_tokens
            .values()
            .filter(|t| t.identity_id == identity_id)
            .cloned()
            .collect();
        newest_first(&mut tokens, |t| t.created_at);
        Ok(tokens)
    }

    async fn update_api_token(
        &mut self,
        id: Uuid,
        changes: UpdateApiToken,
    ) -> AppResult<ScopedCredential> {
        let token = self
            .staged
            .api_tokens
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("API token not found"))?;
        if let Some(name) = changes.name {
            token.name = name;
        }
        if let Some(scopes) = changes.scopes {
            token.scopes = scopes;
        }
        if let Some(is_active) = changes.is_active {
            token.is_active = is_active;
        }
        Ok(token.clone())
    }

    async fn touch_api_token(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let token = self
            .staged
            .api_tokens
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("API token not found"))?;
        token.last_used_at = Some(now);
        Ok(())
    }

    async fn delete_api_token(&mut self, id: Uuid) -> AppResult<bool> {
        Ok(self.staged.api_tokens.remove(&id).is_some())
    }
}

#[async_trait]
impl ApplicationStore for MemoryUnitOfWork {
    async fn insert_application(
        &mut self,
        data: CreateApplication,
        now: DateTime<Utc>,
    ) -> AppResult<Application> {
        if !self.staged.identities.contains_key(&data.owner_id) {
            return Err(AppError::not_found("Owner identity not found"));
        }
        let application = Application {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            name: data.name,
            version: data.version,
            created_at: now,
        };
        self.staged
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn find_application(&mut self, id: Uuid) -> AppResult<Option<Application>> {
        Ok(self.staged.applications.get(&id).cloned())
    }
}

#[async_trait]
impl LicenseStore for MemoryUnitOfWork {
    async fn insert_license(&mut self, data: CreateLicense) -> AppResult<License> {
        if self
            .staged
            .licenses
            .values()
            .any(|l| l.key_hash == data.key_hash)
        {
            return Err(AppError::conflict("License key already exists"));
        }
        if data.max_activations < 1 {
            return Err(AppError::internal(
                "licenses row violates max_activations >= 1",
            ));
        }
        let license = License {
            id: Uuid::new_v4(),
            key_hash: data.key_hash,
            application_id: data.application_id,
            customer_id: data.customer_id,
            status: LicenseStatus::Active,
            expires_at: data.expires_at,
            max_activations: data.max_activations,
            activation_count: 0,
            features: data.features,
            notes: data.notes,
            created_at: data.created_at,
            updated_at: data.created_at,
        };
        self.staged.licenses.insert(license.id, license.clone());
        Ok(license)
    }

    async fn find_license(&mut self, id: Uuid) -> AppResult<Option<License>> {
        Ok(self.staged.licenses.get(&id).cloned())
    }

    async fn lock_license(&mut self, id: Uuid) -> AppResult<Option<License>> {
        Ok(self.staged.licenses.get(&id).cloned())
    }

    async fn lock_license_by_key_hash(&mut self, key_hash: &str) -> AppResult<Option<License>> {
        Ok(self
            .staged
            .licenses
            .values()
            .find(|l| l.key_hash == key_hash)
            .cloned())
    }

    async fn list_licenses_by_application(
        &mut self,
        application_id: Uuid,
    ) -> AppResult<Vec<License>> {
        let mut licenses: Vec<_> = self
            .staged
            .licenses
            .values()
            .filter(|l| l.application_id == application_id)
            .cloned()
            .collect();
        newest_first(&mut licenses, |l| l.created_at);
        Ok(licenses)
    }

    async fn save_license(&mut self, license: &License) -> AppResult<()> {
        if license.max_activations < 1
            || license.activation_count < 0
            || license.activation_count > license.max_activations
        {
            return Err(AppError::internal(
                "licenses row violates chk_activation_count",
            ));
        }
        let stored = self
            .staged
            .licenses
            .get_mut(&license.id)
            .ok_or_else(|| AppError::not_found("License not found"))?;
        stored.status = license.status;
        stored.expires_at = license.expires_at;
        stored.max_activations = license.max_activations;
        stored.activation_count = license.activation_count;
        stored.features = license.features.clone();
        stored.notes = license.notes.clone();
        stored.updated_at = license.updated_at;
        Ok(())
    }

    async fn delete_license(&mut self, id: Uuid) -> AppResult<bool> {
        if self.staged.licenses.remove(&id).is_none() {
            return Ok(false);
        }
        self.staged.activations.retain(|_, a| a.license_id != id);
        self.staged.request_forms.retain(|_, f| f.license_id != id);
        self.staged.offline_codes.retain(|_, c| c.license_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ActivationStore for MemoryUnitOfWork {
    async fn find_activation(&mut self, id: Uuid) -> AppResult<Option<Activation>> {
        Ok(self.staged.activations.get(&id).cloned())
    }

    async fn find_active_activation(
        &mut self,
        license_id: Uuid,
        machine_fingerprint: &str,
    ) -> AppResult<Option<Activation>> {
        Ok(self
            .staged
            .activations
            .values()
            .find(|a| {
                a.license_id == license_id
                    && a.machine_fingerprint == machine_fingerprint
                    && a.is_active()
            })
            .cloned())
    }

    async fn insert_activation(&mut self, data: CreateActivation) -> AppResult<Activation> {
        let duplicate = self.staged.activations.values().any(|a| {
            a.license_id == data.license_id
                && a.machine_fingerprint == data.machine_fingerprint
                && a.is_active()
        });
        if duplicate {
            return Err(AppError::conflict("Machine is already activated"));
        }
        let activation = Activation {
            id: Uuid::new_v4(),
            license_id: data.license_id,
            machine_fingerprint: data.machine_fingerprint,
            machine_name: data.machine_name,
            origin_address: data.origin_address,
            status: ActivationStatus::Active,
            activated_at: data.activated_at,
            last_heartbeat: data.activated_at,
        };
        self.staged
            .activations
            .insert(activation.id, activation.clone());
        Ok(activation)
    }

    async fn touch_activation(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let activation = self
            .staged
            .activations
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Activation not found"))?;
        activation.last_heartbeat = now;
        Ok(())
    }

    async fn delete_activation(&mut self, id: Uuid) -> AppResult<bool> {
        Ok(self.staged.activations.remove(&id).is_some())
    }

    async fn list_activations(&mut self, license_id: Uuid) -> AppResult<Vec<Activation>> {
        let mut activations: Vec<_> = self
            .staged
            .activations
            .values()
            .filter(|a| a.license_id == license_id)
            .cloned()
            .collect();
        activations.sort_by_key(|a| a.activated_at);
        Ok(activations)
    }

    async fn list_activations_for_owner(&mut self, owner_id: Uuid) -> AppResult<Vec<Activation>> {
        let mut activations: Vec<_> = self
            .staged
            .activations
            .values()
            .filter(|a| self.staged.owns_license(owner_id, a.license_id))
            .cloned()
            .collect();
        newest_first(&mut activations, |a| a.activated_at);
        Ok(activations)
    }
}

#[async_trait]
impl OfflineStore for MemoryUnitOfWork {
    async fn insert_request_form(
        &mut self,
        data: CreateRequestForm,
    ) -> AppResult<ActivationRequestForm> {
        if self
            .staged
            .request_forms
            .values()
            .any(|f| f.request_code == data.request_code)
        {
            return Err(AppError::conflict("Request code already exists"));
        }
        let form = ActivationRequestForm {
            id: Uuid::new_v4(),
            request_code: data.request_code,
            license_id: data.license_id,
            machine_fingerprint: data.machine_fingerprint,
            machine_name: data.machine_name,
            status: RequestStatus::Pending,
            activation_code: None,
            created_at: data.created_at,
            expires_at: data.expires_at,
            completed_at: None,
        };
        self.staged.request_forms.insert(form.id, form.clone());
        Ok(form)
    }

    async fn find_request_form(
        &mut self,
        request_code: &str,
    ) -> AppResult<Option<ActivationRequestForm>> {
        Ok(self
            .staged
            .request_forms
            .values()
            .find(|f| f.request_code == request_code)
            .cloned())
    }

    async fn find_request_form_by_id(
        &mut self,
        id: Uuid,
    ) -> AppResult<Option<ActivationRequestForm>> {
        Ok(self.staged.request_forms.get(&id).cloned())
    }

    async fn list_request_forms_for_owner(
        &mut self,
        owner_id: Uuid,
    ) -> AppResult<Vec<ActivationRequestForm>> {
        let mut forms: Vec<_> = self
            .staged
            .request_forms
            .values()
            .filter(|f| self.staged.owns_license(owner_id, f.license_id))
            .cloned()
            .collect();
        newest_first(&mut forms, |f| f.created_at);
        Ok(forms)
    }

    async fn lock_request_form(
        &mut self,
        request_code: &str,
    ) -> AppResult<Option<ActivationRequestForm>> {
        self.find_request_form(request_code).await
    }

    async fn complete_request_form(
        &mut self,
        id: Uuid,
        activation_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let form = self
            .staged
            .request_forms
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Activation request not found"))?;
        form.status = RequestStatus::Completed;
        form.activation_code = Some(activation_code.to_string());
        form.completed_at = Some(now);
        Ok(())
    }

    async fn insert_offline_code(
        &mut self,
        data: CreateOfflineCode,
    ) -> AppResult<OfflineActivationCode> {
        if self
            .staged
            .offline_codes
            .values()
            .any(|c| c.code == data.code)
        {
            return Err(AppError::conflict("Activation code already exists"));
        }
        let code = OfflineActivationCode {
            id: Uuid::new_v4(),
            license_id: data.license_id,
            code: data.code,
            machine_fingerprint: data.machine_fingerprint,
            is_used: false,
            created_at: data.created_at,
            expires_at: data.expires_at,
            used_at: None,
        };
        self.staged.offline_codes.insert(code.id, code.clone());
        Ok(code)
    }

    async fn lock_offline_code(&mut self, code: &str) -> AppResult<Option<OfflineActivationCode>> {
        Ok(self
            .staged
            .offline_codes
            .values()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn mark_offline_code_used(&mut self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let code = self
            .staged
            .offline_codes
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Activation code not found"))?;
        code.is_used = true;
        code.used_at = Some(now);
        Ok(())
    }
}
