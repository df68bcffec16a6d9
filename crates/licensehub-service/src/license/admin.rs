//! License administration for application owners.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use licensehub_auth::authenticator::Principal;
use licensehub_auth::rbac::ScopeEnforcer;
use licensehub_core::config::LicenseConfig;
use licensehub_core::error::AppError;
use licensehub_core::traits::{Clock, RandomSource};
use licensehub_database::store::Store;
use licensehub_entity::license::{CreateLicense, FeatureSet, License, LicenseStatus, UpdateLicense};
use licensehub_entity::scope::Scope;

use super::key::LicenseKeyFormat;
use crate::ownership;

/// Input for creating a license.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLicenseRequest {
    /// Owning application. Must belong to the caller.
    pub application_id: Uuid,
    /// Optional owning customer.
    pub customer_id: Option<Uuid>,
    /// Optional absolute expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Activation ceiling; the configured default when absent.
    pub max_activations: Option<i32>,
    /// Enabled features.
    pub features: FeatureSet,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// A freshly created license.
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    /// The plaintext key. Returned exactly once.
    pub key: String,
    /// The stored record.
    pub license: License,
}

/// Administrative operations on licenses the caller owns.
#[derive(Debug, Clone)]
pub struct LicenseAdmin {
    store: Arc<dyn Store>,
    format: LicenseKeyFormat,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    config: LicenseConfig,
}

impl LicenseAdmin {
    /// Creates a new license administrator.
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        config: LicenseConfig,
    ) -> Self {
        Self {
            store,
            format: LicenseKeyFormat::from_config(&config),
            clock,
            random,
            config,
        }
    }

    /// Creates a license and returns its plaintext key.
    pub async fn create(
        &self,
        principal: &Principal,
        request: CreateLicenseRequest,
    ) -> Result<IssuedLicense, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::LicenseWrite.into())?;
        let now = self.clock.now();
        let max_activations = request
            .max_activations
            .unwrap_or(self.config.default_max_activations);
        if max_activations < 1 {
            return Err(AppError::validation("max_activations must be at least 1"));
        }
        if request.expires_at.is_some_and(|exp| exp <= now) {
            return Err(AppError::validation("Expiry must be in the future"));
        }

        let mut uow = self.store.begin().await?;
        ownership::owned_application(uow.as_mut(), request.application_id, principal.identity.id)
            .await?;

        let key = self.format.generate(self.random.as_ref());
        let license = uow
            .insert_license(CreateLicense {
                key_hash: self.format.hash(&key),
                application_id: request.application_id,
                customer_id: request.customer_id,
                expires_at: request.expires_at,
                max_activations,
                features: request.features,
                notes: request.notes,
                created_at: now,
            })
            .await?;
        uow.commit().await?;

        info!(
            license_id = %license.id,
            application_id = %license.application_id,
            max_activations,
            "License created"
        );
        Ok(IssuedLicense { key, license })
    }

    /// Fetches a license the caller owns.
    pub async fn get(&self, principal: &Principal, license_id: Uuid) -> Result<License, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::LicenseRead.into())?;
        let mut uow = self.store.begin().await?;
        ownership::find_owned_license(uow.as_mut(), license_id, principal.identity.id).await
    }

    /// Fetches a license the caller owns by its plaintext key.
    pub async fn get_by_key(&self, principal: &Principal, raw_key: &str) -> Result<License, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::LicenseRead.into())?;
        let normalized = self
            .format
            .parse(raw_key)
            .ok_or_else(|| AppError::invalid_format("Invalid license key format"))?;
        let mut uow = self.store.begin().await?;
        let license = uow
            .lock_license_by_key_hash(&self.format.hash(&normalized))
            .await?
            .ok_or_else(|| AppError::not_found("License not found"))?;
        if ownership::owns_license(uow.as_mut(), &license, principal.identity.id).await? {
            Ok(license)
        } else {
            Err(AppError::not_found("License not found"))
        }
    }

    /// Lists the licenses of an application the caller owns.
    pub async fn list_by_application(
        &self,
        principal: &Principal,
        application_id: Uuid,
    ) -> Result<Vec<License>, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::LicenseRead.into())?;
        let mut uow = self.store.begin().await?;
        ownership::owned_application(uow.as_mut(), application_id, principal.identity.id).await?;
        uow.list_licenses_by_application(application_id).await
    }

    /// Applies administrative changes to a license.
    ///
    /// The ceiling may not drop below the machines currently holding slots.
    pub async fn update(
        &self,
        principal: &Principal,
        license_id: Uuid,
        changes: UpdateLicense,
    ) -> Result<License, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::LicenseWrite.into())?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let mut license =
            ownership::lock_owned_license(uow.as_mut(), license_id, principal.identity.id).await?;

        if let Some(max) = changes.max_activations {
            if max < 1 || max < license.activation_count {
                return Err(AppError::validation(format!(
                    "max_activations must be at least {}",
                    license.activation_count.max(1)
                )));
            }
            license.max_activations = max;
        }
        if let Some(expires_at) = changes.expires_at {
            license.expires_at = expires_at;
        }
        if let Some(features) = changes.features {
            license.features = features;
        }
        if let Some(notes) = changes.notes {
            license.notes = notes;
        }
        license.updated_at = now;
        uow.save_license(&license).await?;
        uow.commit().await?;

        info!(license_id = %license.id, "License updated");
        Ok(license)
    }

    /// Blocks an active license.
    pub async fn block(&self, principal: &Principal, license_id: Uuid) -> Result<License, AppError> {
        self.transition(
            principal,
            license_id,
            Scope::LicenseWrite,
            &[LicenseStatus::Active],
            LicenseStatus::Blocked,
        )
        .await
    }

    /// Returns a blocked license to active.
    pub async fn unblock(
        &self,
        principal: &Principal,
        license_id: Uuid,
    ) -> Result<License, AppError> {
        self.transition(
            principal,
            license_id,
            Scope::LicenseWrite,
            &[LicenseStatus::Blocked],
            LicenseStatus::Active,
        )
        .await
    }

    /// Suspends an active license.
    pub async fn suspend(
        &self,
        principal: &Principal,
        license_id: Uuid,
    ) -> Result<License, AppError> {
        self.transition(
            principal,
            license_id,
            Scope::LicenseWrite,
            &[LicenseStatus::Active],
            LicenseStatus::Suspended,
        )
        .await
    }

    /// Revokes a license permanently.
    pub async fn revoke(
        &self,
        principal: &Principal,
        license_id: Uuid,
    ) -> Result<License, AppError> {
        self.transition(
            principal,
            license_id,
            Scope::LicenseDelete,
            &[
                LicenseStatus::Active,
                LicenseStatus::Suspended,
                LicenseStatus::Blocked,
            ],
            LicenseStatus::Revoked,
        )
        .await
    }

    /// Deletes a license with its activations, request forms and codes.
    pub async fn delete(&self, principal: &Principal, license_id: Uuid) -> Result<(), AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::LicenseDelete.into())?;
        let mut uow = self.store.begin().await?;
        let license =
            ownership::lock_owned_license(uow.as_mut(), license_id, principal.identity.id).await?;
        if !uow.delete_license(license.id).await? {
            return Err(AppError::not_found("License not found"));
        }
        uow.commit().await?;

        info!(
            license_id = %license.id,
            activation_count = license.activation_count,
            "License deleted"
        );
        Ok(())
    }

    async fn transition(
        &self,
        principal: &Principal,
        license_id: Uuid,
        scope: Scope,
        from: &[LicenseStatus],
        to: LicenseStatus,
    ) -> Result<License, AppError> {
        ScopeEnforcer::require(&principal.scopes, &scope.into())?;
        let mut uow = self.store.begin().await?;
        let mut license =
            ownership::lock_owned_license(uow.as_mut(), license_id, principal.identity.id).await?;
        if !from.contains(&license.status) {
            return Err(AppError::invalid_state(format!(
                "Cannot change license from {} to {to}",
                license.status
            )));
        }

        let previous = license.status;
        license.status = to;
        license.updated_at = self.clock.now();
        uow.save_license(&license).await?;
        uow.commit().await?;

        info!(license_id = %license.id, from = %previous, to = %to, "License status changed");
        Ok(license)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ServiceHarness;
    use licensehub_auth::authenticator::CredentialKind;
    use licensehub_core::error::ErrorKind;
    use licensehub_entity::license::FeatureValue;
    use licensehub_entity::scope::ScopeSet;

    #[tokio::test]
    async fn test_create_returns_key_once_and_stores_hash() {
        let h = ServiceHarness::new().await;
        let mut features = FeatureSet::new();
        features.insert("export", FeatureValue::Flag(true));
        let issued = h
            .admin
            .create(
                &h.owner_principal(),
                CreateLicenseRequest {
                    application_id: h.application.id,
                    max_activations: Some(3),
                    features,
                    ..CreateLicenseRequest::default()
                },
            )
            .await
            .unwrap();

        assert!(h.format.is_valid(&issued.key));
        assert_eq!(issued.license.key_hash, h.format.hash(&issued.key));
        assert_ne!(issued.license.key_hash, issued.key);
        assert_eq!(issued.license.status, LicenseStatus::Active);
        assert_eq!(issued.license.activation_count, 0);
        assert!(issued.license.features.is_enabled("export"));
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let h = ServiceHarness::new().await;
        let err = h
            .admin
            .create(
                &h.owner_principal(),
                CreateLicenseRequest {
                    application_id: h.application.id,
                    max_activations: Some(0),
                    ..CreateLicenseRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let stranger = h.register_owner("stranger").await;
        let err = h
            .admin
            .create(
                &h.principal_for(&stranger),
                CreateLicenseRequest {
                    application_id: h.application.id,
                    ..CreateLicenseRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_read_scope_cannot_write() {
        let h = ServiceHarness::new().await;
        let (license, _) = h.create_license(1).await;
        let reader = Principal {
            identity: h.owner.clone(),
            scopes: [Scope::LicenseRead].into_iter().collect::<ScopeSet>(),
            credential: CredentialKind::ApiToken { id: Uuid::new_v4() },
        };

        assert_eq!(h.admin.get(&reader, license.id).await.unwrap().id, license.id);
        let err = h
            .admin
            .create(
                &reader,
                CreateLicenseRequest {
                    application_id: h.application.id,
                    ..CreateLicenseRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_ceiling_cannot_drop_below_counter() {
        let h = ServiceHarness::new().await;
        let (license, key) = h.create_license(3).await;
        h.validator.validate(&key, "m-1", None).await.unwrap();
        h.validator.validate(&key, "m-2", None).await.unwrap();

        let err = h
            .admin
            .update(
                &h.owner_principal(),
                license.id,
                UpdateLicense {
                    max_activations: Some(1),
                    ..UpdateLicense::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let updated = h
            .admin
            .update(
                &h.owner_principal(),
                license.id,
                UpdateLicense {
                    max_activations: Some(2),
                    notes: Some(Some("downgraded".into())),
                    ..UpdateLicense::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.max_activations, 2);
        assert_eq!(updated.notes.as_deref(), Some("downgraded"));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let h = ServiceHarness::new().await;
        let owner = h.owner_principal();
        let (license, _) = h.create_license(1).await;

        let err = h.admin.unblock(&owner, license.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        assert_eq!(
            h.admin.block(&owner, license.id).await.unwrap().status,
            LicenseStatus::Blocked
        );
        assert_eq!(
            h.admin.unblock(&owner, license.id).await.unwrap().status,
            LicenseStatus::Active
        );
        assert_eq!(
            h.admin.suspend(&owner, license.id).await.unwrap().status,
            LicenseStatus::Suspended
        );
        assert_eq!(
            h.admin.revoke(&owner, license.id).await.unwrap().status,
            LicenseStatus::Revoked
        );
        let err = h.admin.block(&owner, license.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_list_by_application() {
        let h = ServiceHarness::new().await;
        h.create_license(1).await;
        h.create_license(2).await;
        let listed = h
            .admin
            .list_by_application(&h.owner_principal(), h.application.id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn test_get_by_key_is_owner_scoped() {
        let h = ServiceHarness::new().await;
        let (license, key) = h.create_license(1).await;

        let found = h
            .admin
            .get_by_key(&h.owner_principal(), &key.to_lowercase())
            .await
            .unwrap();
        assert_eq!(found.id, license.id);

        let stranger = h.register_owner("stranger").await;
        let err = h
            .admin
            .get_by_key(&h.principal_for(&stranger), &key)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = h
            .admin
            .get_by_key(&h.owner_principal(), "not-a-key")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFormat);
    }

    #[tokio::test]
    async fn test_delete_removes_license_and_activations() {
        let h = ServiceHarness::new().await;
        let (license, key) = h.create_license(2).await;
        h.validator.validate(&key, "m-1", None).await.unwrap();

        let stranger = h.register_owner("stranger").await;
        let err = h
            .admin
            .delete(&h.principal_for(&stranger), license.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let writer = h.principal_with(&h.owner, [Scope::LicenseRead, Scope::LicenseWrite]);
        let err = h.admin.delete(&writer, license.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);

        h.admin.delete(&h.owner_principal(), license.id).await.unwrap();
        let err = h.admin.get(&h.owner_principal(), license.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let mut uow = h.store.begin().await.unwrap();
        assert!(uow.list_activations(license.id).await.unwrap().is_empty());
        drop(uow);

        let result = h.validator.validate(&key, "m-1", None).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.message, "License key not found");
    }
}
