//! Activation repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use licensehub_core::result::AppResult;
use licensehub_entity::activation::{Activation, ActivationStatus, CreateActivation};

use super::{db_error, expect_row};

/// Repository for the `activations` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivationRepository;

impl ActivationRepository {
    /// Find an activation by ID.
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Activation>> {
        sqlx::query_as::<_, Activation>("SELECT * FROM activations WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to find activation"))
    }

    /// Find the active activation of a machine on a license.
    pub async fn find_active(
        conn: &mut PgConnection,
        license_id: Uuid,
        machine_fingerprint: &str,
    ) -> AppResult<Option<Activation>> {
        sqlx::query_as::<_, Activation>(
            "SELECT * FROM activations WHERE license_id = $1 AND machine_fingerprint = $2 \
             AND status = $3",
        )
        .bind(license_id)
        .bind(machine_fingerprint)
        .bind(ActivationStatus::Active)
        .fetch_optional(conn)
        .await
        .map_err(db_error("Failed to find activation"))
    }

    /// Insert a new active activation.
    pub async fn create(conn: &mut PgConnection, data: CreateActivation) -> AppResult<Activation> {
        sqlx::query_as::<_, Activation>(
            "INSERT INTO activations (id, license_id, machine_fingerprint, machine_name, \
             origin_address, status, activated_at, last_heartbeat) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.license_id)
        .bind(&data.machine_fingerprint)
        .bind(&data.machine_name)
        .bind(&data.origin_address)
        .bind(ActivationStatus::Active)
        .bind(data.activated_at)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to create activation"))
    }

    /// Update the heartbeat of an activation.
    pub async fn touch(conn: &mut PgConnection, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query("UPDATE activations SET last_heartbeat = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(conn)
            .await
            .map_err(db_error("Failed to update heartbeat"))?;
        expect_row(result.rows_affected(), "Activation")
    }

    /// Delete an activation.
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM activations WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(db_error("Failed to delete activation"))?;
        Ok(result.rows_affected() > 0)
    }

    /// List the activations of a license.
    pub async fn find_by_license(
        conn: &mut PgConnection,
        license_id: Uuid,
    ) -> AppResult<Vec<Activation>> {
        sqlx::query_as::<_, Activation>(
            "SELECT * FROM activations WHERE license_id = $1 ORDER BY activated_at ASC",
        )
        .bind(license_id)
        .fetch_all(conn)
        .await
        .map_err(db_error("Failed to list activations"))
    }

    /// List the activations on licenses of applications an identity owns.
    pub async fn find_by_owner(
        conn: &mut PgConnection,
        owner_id: Uuid,
    ) -> AppResult<Vec<Activation>> {
        sqlx::query_as::<_, Activation>(
            "SELECT a.* FROM activations a \
             JOIN licenses l ON l.id = a.license_id \
             JOIN applications p ON p.id = l.application_id \
             WHERE p.owner_id = $1 ORDER BY a.activated_at DESC",
        )
        .bind(owner_id)
        .fetch_all(conn)
        .await
        .map_err(db_error("Failed to list activations"))
    }
}
