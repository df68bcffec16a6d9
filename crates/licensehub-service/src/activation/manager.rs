//! Activation manager: claims, heartbeats and deactivation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use licensehub_auth::authenticator::Principal;
use licensehub_auth::rbac::ScopeEnforcer;
use licensehub_core::error::AppError;
use licensehub_core::traits::Clock;
use licensehub_database::store::{Store, UnitOfWork};
use licensehub_entity::activation::{Activation, CreateActivation};
use licensehub_entity::license::License;
use licensehub_entity::scope::Scope;

use crate::ownership;

/// Result of a successful claim.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    /// The activation holding the slot.
    pub activation: Activation,
    /// Whether the machine already held a slot.
    pub heartbeat: bool,
    /// Slots left after the claim.
    pub remaining_slots: i32,
}

/// Enforces per-license activation ceilings.
#[derive(Debug, Clone)]
pub struct ActivationManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ActivationManager {
    /// Creates a new activation manager.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Claim a slot on `license` for a machine inside the caller's unit of work.
    ///
    /// The license must already be locked by `uow`. A machine that already
    /// holds a slot gets a heartbeat and the counter is left alone. On
    /// success `license` reflects the persisted counter.
    pub async fn claim(
        &self,
        uow: &mut dyn UnitOfWork,
        license: &mut License,
        machine_fingerprint: &str,
        machine_name: Option<&str>,
        origin_address: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, AppError> {
        if let Some(mut existing) = uow
            .find_active_activation(license.id, machine_fingerprint)
            .await?
        {
            uow.touch_activation(existing.id, now).await?;
            existing.last_heartbeat = now;
            debug!(license_id = %license.id, activation_id = %existing.id, "Heartbeat");
            return Ok(ClaimOutcome {
                activation: existing,
                heartbeat: true,
                remaining_slots: license.remaining_slots(),
            });
        }

        if !license.has_headroom() {
            warn!(
                license_id = %license.id,
                max_activations = license.max_activations,
                "Activation limit reached"
            );
            return Err(AppError::limit_reached("Maximum activations reached"));
        }

        let activation = uow
            .insert_activation(CreateActivation {
                license_id: license.id,
                machine_fingerprint: machine_fingerprint.to_string(),
                machine_name: machine_name.map(str::to_string),
                origin_address: origin_address.map(str::to_string),
                activated_at: now,
            })
            .await?;
        license.activation_count += 1;
        license.updated_at = now;
        uow.save_license(license).await?;

        info!(
            license_id = %license.id,
            activation_id = %activation.id,
            activation_count = license.activation_count,
            "Machine activated"
        );
        Ok(ClaimOutcome {
            activation,
            heartbeat: false,
            remaining_slots: license.remaining_slots(),
        })
    }

    /// Remove an activation and free its slot. Requires `activation:delete`.
    ///
    /// Returns `false` when the activation does not exist or belongs to a
    /// license the caller does not own.
    pub async fn deactivate(
        &self,
        principal: &Principal,
        activation_id: Uuid,
    ) -> Result<bool, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::ActivationDelete.into())?;
        let mut uow = self.store.begin().await?;
        let Some(activation) = uow.find_activation(activation_id).await? else {
            return Ok(false);
        };
        let Some(mut license) = uow.lock_license(activation.license_id).await? else {
            return Ok(false);
        };
        if !ownership::owns_license(uow.as_mut(), &license, principal.identity.id).await? {
            return Ok(false);
        }

        // Gone if a concurrent deactivation took the license lock first.
        if !uow.delete_activation(activation.id).await? {
            debug!(activation_id = %activation_id, "Activation already removed");
            return Ok(false);
        }
        license.activation_count = (license.activation_count - 1).max(0);
        license.updated_at = self.clock.now();
        uow.save_license(&license).await?;
        uow.commit().await?;

        info!(
            license_id = %license.id,
            activation_id = %activation_id,
            activation_count = license.activation_count,
            "Machine deactivated"
        );
        Ok(true)
    }

    /// List the activations on every license the caller owns, newest first.
    pub async fn list_for_owner(&self, principal: &Principal) -> Result<Vec<Activation>, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::ActivationRead.into())?;
        let mut uow = self.store.begin().await?;
        uow.list_activations_for_owner(principal.identity.id).await
    }

    /// List the activations of a license the caller owns.
    pub async fn list_for_license(
        &self,
        principal: &Principal,
        license_id: Uuid,
    ) -> Result<Vec<Activation>, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::ActivationRead.into())?;
        let mut uow = self.store.begin().await?;
        let license =
            ownership::find_owned_license(uow.as_mut(), license_id, principal.identity.id).await?;
        uow.list_activations(license.id).await
    }
}
