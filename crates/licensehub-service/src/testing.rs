//! Shared fixtures for unit tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use licensehub_auth::authenticator::{CredentialKind, Principal};
use licensehub_auth::rbac::ScopeCatalog;
use licensehub_core::config::{LicenseConfig, OfflineConfig};
use licensehub_core::traits::{Clock, ManualClock, OsRandom};
use licensehub_database::store::{MemoryStore, Store};
use licensehub_entity::application::{Application, CreateApplication};
use licensehub_entity::identity::{BusinessRole, CreateIdentity, Identity, SystemRole};
use licensehub_entity::license::License;
use licensehub_entity::scope::Scope;

use crate::activation::ActivationManager;
use crate::license::{CreateLicenseRequest, LicenseAdmin, LicenseKeyFormat, LicenseValidator};
use crate::offline::OfflineActivationExchange;

pub(crate) struct ServiceHarness {
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub owner: Identity,
    pub application: Application,
    pub format: LicenseKeyFormat,
    pub validator: LicenseValidator,
    pub activations: ActivationManager,
    pub admin: LicenseAdmin,
    pub offline: OfflineActivationExchange,
    catalog: ScopeCatalog,
}

impl ServiceHarness {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let license_config = LicenseConfig::default();
        let format = LicenseKeyFormat::from_config(&license_config);
        let activations = ActivationManager::new(shared.clone(), clock.clone());
        let validator = LicenseValidator::new(
            shared.clone(),
            activations.clone(),
            format,
            clock.clone(),
        );
        let admin = LicenseAdmin::new(
            shared.clone(),
            clock.clone(),
            Arc::new(OsRandom),
            license_config,
        );
        let offline = OfflineActivationExchange::new(
            shared,
            activations.clone(),
            format,
            clock.clone(),
            Arc::new(OsRandom),
            OfflineConfig::default(),
        );

        let owner = insert_identity(&store, &clock, "owner").await;
        let mut uow = store.begin().await.unwrap();
        let application = uow
            .insert_application(
                CreateApplication {
                    owner_id: owner.id,
                    name: "Modeler".to_string(),
                    version: "4.2".to_string(),
                },
                clock.now(),
            )
            .await
            .unwrap();
        uow.commit().await.unwrap();

        Self {
            store,
            clock,
            owner,
            application,
            format,
            validator,
            activations,
            admin,
            offline,
            catalog: ScopeCatalog::new(),
        }
    }

    /// Register another identity with the default roles.
    pub async fn register_owner(&self, username: &str) -> Identity {
        insert_identity(&self.store, &self.clock, username).await
    }

    pub fn principal_for(&self, identity: &Identity) -> Principal {
        Principal {
            identity: identity.clone(),
            scopes: self.catalog.scopes_for_identity(identity),
            credential: CredentialKind::Session { id: Uuid::new_v4() },
        }
    }

    /// A principal holding exactly `scopes`, as a narrowed API token would.
    pub fn principal_with(
        &self,
        identity: &Identity,
        scopes: impl IntoIterator<Item = Scope>,
    ) -> Principal {
        Principal {
            identity: identity.clone(),
            scopes: scopes.into_iter().collect(),
            credential: CredentialKind::ApiToken { id: Uuid::new_v4() },
        }
    }

    pub fn owner_principal(&self) -> Principal {
        self.principal_for(&self.owner)
    }

    pub async fn create_license(&self, max_activations: i32) -> (License, String) {
        self.issue(max_activations, None).await
    }

    pub async fn create_license_expiring(
        &self,
        max_activations: i32,
        expires_at: DateTime<Utc>,
    ) -> (License, String) {
        self.issue(max_activations, Some(expires_at)).await
    }

    async fn issue(
        &self,
        max_activations: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> (License, String) {
        let issued = self
            .admin
            .create(
                &self.owner_principal(),
                CreateLicenseRequest {
                    application_id: self.application.id,
                    max_activations: Some(max_activations),
                    expires_at,
                    ..CreateLicenseRequest::default()
                },
            )
            .await
            .unwrap();
        (issued.license, issued.key)
    }
}

async fn insert_identity(store: &MemoryStore, clock: &ManualClock, username: &str) -> Identity {
    let mut uow = store.begin().await.unwrap();
    let identity = uow
        .insert_identity(
            CreateIdentity {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                full_name: username.to_string(),
                password_hash: "$argon2id$unused".to_string(),
                business_role: BusinessRole::User,
                system_role: SystemRole::User,
            },
            clock.now(),
        )
        .await
        .unwrap();
    uow.commit().await.unwrap();
    identity
}
