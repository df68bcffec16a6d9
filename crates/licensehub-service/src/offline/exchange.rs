//! Offline activation exchange.
//!
//! 1. The offline machine asks for a request code for its fingerprint.
//! 2. The license owner pre-generates single-use activation codes.
//! 3. The machine redeems one code against its request code; the slot is
//!    claimed exactly as an online validation would.
//!
//! The two calls are joined only by the request code.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use licensehub_auth::authenticator::Principal;
use licensehub_auth::rbac::ScopeEnforcer;
use licensehub_core::config::OfflineConfig;
use licensehub_core::error::AppError;
use licensehub_core::traits::random::ALPHANUMERIC_UPPER;
use licensehub_core::traits::{Clock, RandomSource};
use licensehub_database::store::{Store, UnitOfWork};
use licensehub_entity::license::{License, LicenseStatus};
use licensehub_entity::offline::{
    ActivationRequestForm, CreateOfflineCode, CreateRequestForm, RequestStatus,
};
use licensehub_entity::scope::Scope;

use crate::activation::ActivationManager;
use crate::license::LicenseKeyFormat;
use crate::ownership;

/// Returned to the offline machine after opening a request.
#[derive(Debug, Clone, Serialize)]
pub struct OfflineRequestTicket {
    /// Code to transcribe to the license owner.
    pub request_code: String,
    /// End of the redemption window.
    pub expires_at: DateTime<Utc>,
}

/// A generated activation code.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedActivationCode {
    /// The single-use secret.
    pub code: String,
    /// End of the redemption window.
    pub expires_at: DateTime<Utc>,
}

/// Result of redeeming an activation code.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedRequest {
    /// Always `completed`.
    pub status: RequestStatus,
    /// When the request was completed.
    pub completed_at: DateTime<Utc>,
    /// The activation holding the slot.
    pub activation_id: Uuid,
    /// Free slots after the claim.
    pub remaining_slots: i32,
}

/// Lookup form of a hand-typed request or activation code.
fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Persist the lazily discovered `expired` status and report it.
async fn expire_license(
    mut uow: Box<dyn UnitOfWork>,
    mut license: License,
    now: DateTime<Utc>,
) -> Result<AppError, AppError> {
    license.status = LicenseStatus::Expired;
    license.updated_at = now;
    uow.save_license(&license).await?;
    uow.commit().await?;
    info!(license_id = %license.id, "License expired");
    Ok(AppError::expired("License has expired"))
}

/// Issues request codes and redeems activation codes.
#[derive(Debug, Clone)]
pub struct OfflineActivationExchange {
    store: Arc<dyn Store>,
    activations: ActivationManager,
    format: LicenseKeyFormat,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    config: OfflineConfig,
}

impl OfflineActivationExchange {
    /// Creates a new exchange.
    pub fn new(
        store: Arc<dyn Store>,
        activations: ActivationManager,
        format: LicenseKeyFormat,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        config: OfflineConfig,
    ) -> Self {
        Self {
            store,
            activations,
            format,
            clock,
            random,
            config,
        }
    }

    /// Derive a request code bound to the machine and the moment of the request.
    fn request_code(&self, fingerprint: &str, now: DateTime<Utc>) -> String {
        let nonce = hex::encode(self.random.bytes(16));
        let seed = format!(
            "{fingerprint}:{nonce}:{}",
            now.to_rfc3339_opts(SecondsFormat::Micros, true)
        );
        let mut code = hex::encode(Sha256::digest(seed.as_bytes())).to_uppercase();
        code.truncate(self.config.request_code_length);
        code
    }

    /// Open a pending request for `machine_fingerprint` on the license `raw_key`.
    pub async fn create_request(
        &self,
        raw_key: &str,
        machine_fingerprint: &str,
        machine_name: Option<&str>,
    ) -> Result<OfflineRequestTicket, AppError> {
        let fingerprint = machine_fingerprint.trim();
        if fingerprint.is_empty() {
            return Err(AppError::validation("Machine fingerprint must not be empty"));
        }
        let normalized = self
            .format
            .parse(raw_key)
            .ok_or_else(|| AppError::invalid_format("Invalid license key format"))?;

        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let license = uow
            .lock_license_by_key_hash(&self.format.hash(&normalized))
            .await?
            .ok_or_else(|| AppError::not_found("License key not found"))?;
        if !license.status.is_active() {
            return Err(AppError::invalid_state(format!(
                "License is {}",
                license.status
            )));
        }
        if license.is_expired_at(now) {
            return Err(expire_license(uow, license, now).await?);
        }
        if !license.has_headroom() {
            warn!(license_id = %license.id, "Offline request refused: activation limit reached");
            return Err(AppError::limit_reached("Maximum activations reached"));
        }

        let form = uow
            .insert_request_form(CreateRequestForm {
                request_code: self.request_code(fingerprint, now),
                license_id: license.id,
                machine_fingerprint: fingerprint.to_string(),
                machine_name: machine_name.map(str::to_string),
                created_at: now,
                expires_at: now + Duration::hours(self.config.request_ttl_hours),
            })
            .await?;
        uow.commit().await?;

        info!(
            license_id = %license.id,
            request_code = %form.request_code,
            "Offline activation request created"
        );
        Ok(OfflineRequestTicket {
            request_code: form.request_code,
            expires_at: form.expires_at,
        })
    }

    /// Pre-generate `quantity` single-use activation codes for a license the caller owns.
    /// Requires `activation:write`.
    ///
    /// A code with a `pin` can only be redeemed by that machine.
    pub async fn generate_codes(
        &self,
        principal: &Principal,
        license_id: Uuid,
        pin: Option<&str>,
        quantity: usize,
    ) -> Result<Vec<IssuedActivationCode>, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::ActivationWrite.into())?;
        if quantity == 0 || quantity > self.config.max_codes_per_batch {
            return Err(AppError::validation(format!(
                "Quantity must be between 1 and {}",
                self.config.max_codes_per_batch
            )));
        }
        let pin = pin.map(str::trim).filter(|p| !p.is_empty());

        let now = self.clock.now();
        let expires_at = now + Duration::days(self.config.code_ttl_days);
        let mut uow = self.store.begin().await?;
        let license =
            ownership::lock_owned_license(uow.as_mut(), license_id, principal.identity.id).await?;

        let mut issued = Vec::with_capacity(quantity);
        for _ in 0..quantity {
            let code = uow
                .insert_offline_code(CreateOfflineCode {
                    license_id: license.id,
                    code: self
                        .random
                        .string_from(ALPHANUMERIC_UPPER, self.config.activation_code_length),
                    machine_fingerprint: pin.map(str::to_string),
                    created_at: now,
                    expires_at,
                })
                .await?;
            issued.push(IssuedActivationCode {
                code: code.code,
                expires_at: code.expires_at,
            });
        }
        uow.commit().await?;

        info!(
            license_id = %license.id,
            quantity,
            pinned = pin.is_some(),
            "Offline activation codes generated"
        );
        Ok(issued)
    }

    /// Redeem `activation_code` against the pending request `request_code`.
    ///
    /// Nothing is written unless the whole completion succeeds.
    pub async fn complete_request(
        &self,
        request_code: &str,
        activation_code: &str,
    ) -> Result<CompletedRequest, AppError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let form = uow
            .lock_request_form(&normalize_code(request_code))
            .await?
            .ok_or_else(|| AppError::not_found("Activation request not found"))?;
        match form.effective_status(now) {
            RequestStatus::Completed => {
                return Err(AppError::already_completed(
                    "Activation request already completed",
                ));
            }
            RequestStatus::Expired => {
                return Err(AppError::expired("Activation request has expired"));
            }
            RequestStatus::Pending => {}
        }

        let code = uow
            .lock_offline_code(&normalize_code(activation_code))
            .await?
            .filter(|c| c.license_id == form.license_id)
            .ok_or_else(|| AppError::not_found("Activation code not found"))?;
        if code.is_used {
            warn!(request_code = %form.request_code, "Activation code already used");
            return Err(AppError::already_used("Activation code already used"));
        }
        if code.is_expired_at(now) {
            return Err(AppError::expired("Activation code has expired"));
        }
        if !code.admits_machine(&form.machine_fingerprint) {
            return Err(AppError::permission_denied(
                "Activation code is bound to a different machine",
            ));
        }

        let mut license = uow
            .lock_license(form.license_id)
            .await?
            .ok_or_else(|| AppError::not_found("License not found"))?;
        if !license.status.is_active() {
            return Err(AppError::invalid_state(format!(
                "License is {}",
                license.status
            )));
        }
        if license.is_expired_at(now) {
            return Err(expire_license(uow, license, now).await?);
        }

        let outcome = self
            .activations
            .claim(
                uow.as_mut(),
                &mut license,
                &form.machine_fingerprint,
                form.machine_name.as_deref(),
                None,
                now,
            )
            .await?;
        uow.mark_offline_code_used(code.id, now).await?;
        uow.complete_request_form(form.id, &code.code, now).await?;
        uow.commit().await?;

        info!(
            license_id = %license.id,
            request_code = %form.request_code,
            activation_id = %outcome.activation.id,
            "Offline activation completed"
        );
        Ok(CompletedRequest {
            status: RequestStatus::Completed,
            completed_at: now,
            activation_id: outcome.activation.id,
            remaining_slots: outcome.remaining_slots,
        })
    }

    /// Look up a request form. Pending forms past their window read as expired.
    pub async fn get_request(&self, request_code: &str) -> Result<ActivationRequestForm, AppError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let mut form = uow
            .find_request_form(&normalize_code(request_code))
            .await?
            .ok_or_else(|| AppError::not_found("Activation request not found"))?;
        form.status = form.effective_status(now);
        Ok(form)
    }

    /// Look up a request form on a license the caller owns by ID.
    pub async fn get_request_by_id(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<ActivationRequestForm, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::ActivationRead.into())?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let mut form = uow
            .find_request_form_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Activation request not found"))?;
        let owned = match uow.find_license(form.license_id).await? {
            Some(license) => {
                ownership::owns_license(uow.as_mut(), &license, principal.identity.id).await?
            }
            None => false,
        };
        if !owned {
            return Err(AppError::not_found("Activation request not found"));
        }
        form.status = form.effective_status(now);
        Ok(form)
    }

    /// List the request forms on every license the caller owns, newest first.
    pub async fn list_requests(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ActivationRequestForm>, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::ActivationRead.into())?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let mut forms = uow
            .list_request_forms_for_owner(principal.identity.id)
            .await?;
        for form in &mut forms {
            form.status = form.effective_status(now);
        }
        Ok(forms)
    }
}
