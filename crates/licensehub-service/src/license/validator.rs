//! License key validation.
//!
//! Validation is the public activation path: a well-formed key for an
//! active, unexpired license claims (or heartbeats) a slot for the
//! presenting machine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use licensehub_core::error::{AppError, ErrorKind};
use licensehub_core::traits::Clock;
use licensehub_database::store::Store;
use licensehub_entity::license::{FeatureSet, License, LicenseStatus};

use super::key::LicenseKeyFormat;
use crate::activation::ActivationManager;

/// Outcome of validating a license key.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    /// Whether the key is usable on the presenting machine.
    pub valid: bool,
    /// Resolved license.
    pub license_id: Option<Uuid>,
    /// Owning customer.
    pub customer_id: Option<Uuid>,
    /// Owning application.
    pub application_id: Option<Uuid>,
    /// License status.
    pub status: Option<LicenseStatus>,
    /// License expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Enabled features.
    pub features: Option<FeatureSet>,
    /// Free slots after the claim.
    pub remaining_slots: Option<i32>,
    /// Human-readable outcome.
    pub message: String,
}

impl ValidationResult {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            license_id: None,
            customer_id: None,
            application_id: None,
            status: None,
            expires_at: None,
            features: None,
            remaining_slots: None,
            message: message.into(),
        }
    }

    fn for_license(license: &License, valid: bool, message: impl Into<String>) -> Self {
        Self {
            valid,
            license_id: Some(license.id),
            customer_id: license.customer_id,
            application_id: Some(license.application_id),
            status: Some(license.status),
            expires_at: license.expires_at,
            features: Some(license.features.clone()),
            remaining_slots: Some(license.remaining_slots()),
            message: message.into(),
        }
    }
}

/// Validates license keys and claims activation slots.
#[derive(Debug, Clone)]
pub struct LicenseValidator {
    store: Arc<dyn Store>,
    activations: ActivationManager,
    format: LicenseKeyFormat,
    clock: Arc<dyn Clock>,
}

impl LicenseValidator {
    /// Creates a new validator.
    pub fn new(
        store: Arc<dyn Store>,
        activations: ActivationManager,
        format: LicenseKeyFormat,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            activations,
            format,
            clock,
        }
    }

    /// Validate `raw_key` for the machine identified by `machine_fingerprint`.
    ///
    /// Rejections are reported in the result, not as errors. Errors are
    /// reserved for bad input and storage failures.
    pub async fn validate(
        &self,
        raw_key: &str,
        machine_fingerprint: &str,
        origin_address: Option<&str>,
    ) -> Result<ValidationResult, AppError> {
        let fingerprint = machine_fingerprint.trim();
        if fingerprint.is_empty() {
            return Err(AppError::validation("Machine fingerprint must not be empty"));
        }
        let Some(normalized) = self.format.parse(raw_key) else {
            return Ok(ValidationResult::rejected("Invalid license key format"));
        };

        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let Some(mut license) = uow
            .lock_license_by_key_hash(&self.format.hash(&normalized))
            .await?
        else {
            return Ok(ValidationResult::rejected("License key not found"));
        };

        if !license.status.is_active() {
            let message = format!("License is {}", license.status);
            return Ok(ValidationResult::for_license(&license, false, message));
        }

        if license.is_expired_at(now) {
            license.status = LicenseStatus::Expired;
            license.updated_at = now;
            uow.save_license(&license).await?;
            uow.commit().await?;
            info!(license_id = %license.id, "License expired");
            return Ok(ValidationResult::for_license(
                &license,
                false,
                "License has expired",
            ));
        }

        match self
            .activations
            .claim(
                uow.as_mut(),
                &mut license,
                fingerprint,
                None,
                origin_address,
                now,
            )
            .await
        {
            Ok(_) => {
                uow.commit().await?;
                Ok(ValidationResult::for_license(
                    &license,
                    true,
                    "License is valid",
                ))
            }
            Err(e) if e.kind == ErrorKind::LimitReached => {
                let mut result =
                    ValidationResult::for_license(&license, false, "Maximum activations reached");
                result.remaining_slots = Some(0);
                Ok(result)
            }
            Err(e) => Err(e),
        }
    }
}
