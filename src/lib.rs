//! # licensehub
//!
//! Credential verification and license activation engine.
//!
//! [`LicenseHub`] wires every service of the workspace onto one shared
//! [`Store`] and exposes the operations an outer request layer calls.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use licensehub_auth::{
    ApiTokenManager, PasswordHasher, Principal, Requirement, ScopeCatalog, ScopeEnforcer,
    SessionManager, TokenAuthenticator,
};
use licensehub_core::config::AppConfig;
use licensehub_core::AppResult;
use licensehub_core::traits::{Clock, OsRandom, RandomSource, SystemClock};
use licensehub_database::{DatabasePool, PgStore, Store};
use licensehub_entity::scope::ScopeSet;
use licensehub_service::{
    ActivationManager, ApplicationAdmin, CompletedRequest, IssuedActivationCode, LicenseAdmin,
    LicenseKeyFormat, LicenseValidator, OfflineActivationExchange, OfflineRequestTicket,
    ValidationResult,
};

pub use licensehub_auth as auth;
pub use licensehub_core as core;
pub use licensehub_database as database;
pub use licensehub_entity as entity;
pub use licensehub_service as service;

/// All LicenseHub services sharing one store, clock and random source.
///
/// Every field is cheap to clone; clone the whole hub into tasks.
#[derive(Debug, Clone)]
pub struct LicenseHub {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Transactional persistence handle.
    pub store: Arc<dyn Store>,
    /// Role to scope tables.
    pub catalog: Arc<ScopeCatalog>,

    /// Bearer credential verification.
    pub authenticator: TokenAuthenticator,
    /// Registration, login and identity administration.
    pub sessions: SessionManager,
    /// Scoped API token management.
    pub api_tokens: ApiTokenManager,

    /// Application registration.
    pub applications: ApplicationAdmin,
    /// License administration.
    pub licenses: LicenseAdmin,
    /// Online license validation.
    pub validator: LicenseValidator,
    /// Activation slot accounting.
    pub activations: ActivationManager,
    /// Offline activation exchange.
    pub offline: OfflineActivationExchange,
}

impl LicenseHub {
    /// Build the hub over an existing store.
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        config: AppConfig,
    ) -> AppResult<Self> {
        let catalog = Arc::new(ScopeCatalog::new());
        let hasher = Arc::new(PasswordHasher::new(&config.auth)?);
        let format = LicenseKeyFormat::from_config(&config.license);

        let authenticator = TokenAuthenticator::new(
            store.clone(),
            catalog.clone(),
            clock.clone(),
            config.auth.dummy_verify_rounds,
        );
        let sessions = SessionManager::new(
            store.clone(),
            hasher,
            clock.clone(),
            random.clone(),
            config.auth.clone(),
        );
        let api_tokens = ApiTokenManager::new(
            store.clone(),
            catalog.clone(),
            clock.clone(),
            random.clone(),
            config.auth.clone(),
        );
        let applications = ApplicationAdmin::new(store.clone(), clock.clone());
        let licenses = LicenseAdmin::new(
            store.clone(),
            clock.clone(),
            random.clone(),
            config.license.clone(),
        );
        let activations = ActivationManager::new(store.clone(), clock.clone());
        let validator =
            LicenseValidator::new(store.clone(), activations.clone(), format, clock.clone());
        let offline = OfflineActivationExchange::new(
            store.clone(),
            activations.clone(),
            format,
            clock,
            random,
            config.offline.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            catalog,
            authenticator,
            sessions,
            api_tokens,
            applications,
            licenses,
            validator,
            activations,
            offline,
        })
    }

    /// Connect to PostgreSQL and build the hub with the system clock and OS randomness.
    ///
    /// Migrations are not applied here.
    pub async fn connect(config: AppConfig) -> AppResult<Self> {
        let pool = DatabasePool::connect(&config.database).await?;
        let store: Arc<dyn Store> = Arc::new(PgStore::from(pool));
        let hub = Self::new(store, Arc::new(SystemClock), Arc::new(OsRandom), config)?;
        info!(version = env!("CARGO_PKG_VERSION"), "LicenseHub initialized");
        Ok(hub)
    }

    /// Verify a bearer credential. Every rejection is the same opaque error.
    pub async fn authenticate(&self, bearer: Option<&str>) -> AppResult<Principal> {
        self.authenticator.verify(bearer).await
    }

    /// Check a scope requirement against a granted set.
    pub fn authorize(&self, granted: &ScopeSet, requirement: &Requirement) -> bool {
        ScopeEnforcer::authorize(granted, requirement)
    }

    /// Validate a license key for a machine, claiming a slot when valid.
    pub async fn validate_license(
        &self,
        raw_key: &str,
        machine_fingerprint: &str,
        origin: Option<&str>,
    ) -> AppResult<ValidationResult> {
        self.validator
            .validate(raw_key, machine_fingerprint, origin)
            .await
    }

    /// Release an activation the caller owns. `false` when absent or not owned.
    pub async fn deactivate(&self, principal: &Principal, activation_id: Uuid) -> AppResult<bool> {
        self.activations.deactivate(principal, activation_id).await
    }

    /// Open an offline activation request.
    pub async fn create_offline_request(
        &self,
        raw_key: &str,
        machine_fingerprint: &str,
        machine_name: Option<&str>,
    ) -> AppResult<OfflineRequestTicket> {
        self.offline
            .create_request(raw_key, machine_fingerprint, machine_name)
            .await
    }

    /// Pre-generate single-use offline activation codes.
    pub async fn generate_offline_codes(
        &self,
        principal: &Principal,
        license_id: Uuid,
        pin: Option<&str>,
        quantity: usize,
    ) -> AppResult<Vec<IssuedActivationCode>> {
        self.offline
            .generate_codes(principal, license_id, pin, quantity)
            .await
    }

    /// Redeem an activation code against a pending request.
    pub async fn complete_offline_request(
        &self,
        request_code: &str,
        activation_code: &str,
    ) -> AppResult<CompletedRequest> {
        self.offline
            .complete_request(request_code, activation_code)
            .await
    }
}
