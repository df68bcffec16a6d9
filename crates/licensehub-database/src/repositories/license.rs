//! License repository implementation.

use sqlx::PgConnection;
use sqlx::types::Json;
use uuid::Uuid;

use licensehub_core::result::AppResult;
use licensehub_entity::license::{CreateLicense, License, LicenseStatus};

use super::{db_error, expect_row};

/// Repository for the `licenses` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct LicenseRepository;

impl LicenseRepository {
    /// Insert a new license.
    pub async fn create(conn: &mut PgConnection, data: CreateLicense) -> AppResult<License> {
        sqlx::query_as::<_, License>(
            "INSERT INTO licenses (id, key_hash, application_id, customer_id, status, expires_at, \
             max_activations, activation_count, features, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10, $10) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.key_hash)
        .bind(data.application_id)
        .bind(data.customer_id)
        .bind(LicenseStatus::Active)
        .bind(data.expires_at)
        .bind(data.max_activations)
        .bind(Json(&data.features))
        .bind(&data.notes)
        .bind(data.created_at)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to create license"))
    }

    /// Find a license by ID.
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<License>> {
        sqlx::query_as::<_, License>("SELECT * FROM licenses WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to find license"))
    }

    /// Find a license by ID and hold its row lock until the transaction ends.
    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<License>> {
        sqlx::query_as::<_, License>("SELECT * FROM licenses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to lock license"))
    }

    /// Find a license by key hash and hold its row lock.
    pub async fn lock_by_key_hash(
        conn: &mut PgConnection,
        key_hash: &str,
    ) -> AppResult<Option<License>> {
        sqlx::query_as::<_, License>("SELECT * FROM licenses WHERE key_hash = $1 FOR UPDATE")
            .bind(key_hash)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to lock license by key"))
    }

    /// List the licenses of an application.
    pub async fn find_by_application(
        conn: &mut PgConnection,
        application_id: Uuid,
    ) -> AppResult<Vec<License>> {
        sqlx::query_as::<_, License>(
            "SELECT * FROM licenses WHERE application_id = $1 ORDER BY created_at DESC",
        )
        .bind(application_id)
        .fetch_all(conn)
        .await
        .map_err(db_error("Failed to list licenses"))
    }

    /// Write back the mutable fields of a license.
    pub async fn save(conn: &mut PgConnection, license: &License) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE licenses SET status = $2, expires_at = $3, max_activations = $4, \
             activation_count = $5, features = $6, notes = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(license.id)
        .bind(license.status)
        .bind(license.expires_at)
        .bind(license.max_activations)
        .bind(license.activation_count)
        .bind(Json(&license.features))
        .bind(&license.notes)
        .bind(license.updated_at)
        .execute(conn)
        .await
        .map_err(db_error("Failed to update license"))?;
        expect_row(result.rows_affected(), "License")
    }

    /// Delete a license. Dependent rows go with it through `ON DELETE CASCADE`.
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM licenses WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(db_error("Failed to delete license"))?;
        Ok(result.rows_affected() > 0)
    }
}
