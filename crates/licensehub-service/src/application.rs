//! Application registration.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use licensehub_auth::authenticator::Principal;
use licensehub_auth::rbac::ScopeEnforcer;
use licensehub_core::error::AppError;
use licensehub_core::traits::Clock;
use licensehub_database::store::Store;
use licensehub_entity::application::{Application, CreateApplication};
use licensehub_entity::scope::Scope;

use crate::ownership;

/// Registers products that licenses are issued against.
#[derive(Debug, Clone)]
pub struct ApplicationAdmin {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ApplicationAdmin {
    /// Creates a new application administrator.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Registers an application owned by the caller.
    pub async fn register(
        &self,
        principal: &Principal,
        name: &str,
        version: &str,
    ) -> Result<Application, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::ApplicationWrite.into())?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Application name must not be empty"));
        }

        let mut uow = self.store.begin().await?;
        let application = uow
            .insert_application(
                CreateApplication {
                    owner_id: principal.identity.id,
                    name: name.to_string(),
                    version: version.trim().to_string(),
                },
                self.clock.now(),
            )
            .await?;
        uow.commit().await?;

        info!(
            application_id = %application.id,
            owner_id = %application.owner_id,
            "Application registered"
        );
        Ok(application)
    }

    /// Fetches an application the caller owns.
    pub async fn get(
        &self,
        principal: &Principal,
        application_id: Uuid,
    ) -> Result<Application, AppError> {
        ScopeEnforcer::require(&principal.scopes, &Scope::ApplicationRead.into())?;
        let mut uow = self.store.begin().await?;
        ownership::owned_application(uow.as_mut(), application_id, principal.identity.id).await
    }
}
