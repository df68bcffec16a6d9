//! Ownership-filtered lookups.
//!
//! A caller may only see licenses that belong to an application they own.
//! Anything else reads as absent.

use uuid::Uuid;

use licensehub_core::error::AppError;
use licensehub_database::store::UnitOfWork;
use licensehub_entity::application::Application;
use licensehub_entity::license::License;

/// Load an application owned by `owner_id`.
pub async fn owned_application(
    uow: &mut dyn UnitOfWork,
    application_id: Uuid,
    owner_id: Uuid,
) -> Result<Application, AppError> {
    uow.find_application(application_id)
        .await?
        .filter(|app| app.is_owned_by(owner_id))
        .ok_or_else(|| AppError::not_found("Application not found"))
}

/// Whether `owner_id` owns the application `license` belongs to.
pub async fn owns_license(
    uow: &mut dyn UnitOfWork,
    license: &License,
    owner_id: Uuid,
) -> Result<bool, AppError> {
    Ok(uow
        .find_application(license.application_id)
        .await?
        .is_some_and(|app| app.is_owned_by(owner_id)))
}

/// Load and lock a license owned by `owner_id`.
pub async fn lock_owned_license(
    uow: &mut dyn UnitOfWork,
    license_id: Uuid,
    owner_id: Uuid,
) -> Result<License, AppError> {
    let license = uow
        .lock_license(license_id)
        .await?
        .ok_or_else(|| AppError::not_found("License not found"))?;
    if owns_license(uow, &license, owner_id).await? {
        Ok(license)
    } else {
        Err(AppError::not_found("License not found"))
    }
}

/// Load a license owned by `owner_id` without locking it.
pub async fn find_owned_license(
    uow: &mut dyn UnitOfWork,
    license_id: Uuid,
    owner_id: Uuid,
) -> Result<License, AppError> {
    let license = uow
        .find_license(license_id)
        .await?
        .ok_or_else(|| AppError::not_found("License not found"))?;
    if owns_license(uow, &license, owner_id).await? {
        Ok(license)
    } else {
        Err(AppError::not_found("License not found"))
    }
}
