//! Offline request form and activation code repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use licensehub_core::result::AppResult;
use licensehub_entity::offline::{
    ActivationRequestForm, CreateOfflineCode, CreateRequestForm, OfflineActivationCode,
    RequestStatus,
};

use super::{db_error, expect_row};

/// Repository for the `activation_requests` and `offline_activation_codes` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRepository;

impl OfflineRepository {
    /// Insert a new pending request form.
    pub async fn create_request(
        conn: &mut PgConnection,
        data: CreateRequestForm,
    ) -> AppResult<ActivationRequestForm> {
        sqlx::query_as::<_, ActivationRequestForm>(
            "INSERT INTO activation_requests (id, request_code, license_id, machine_fingerprint, \
             machine_name, status, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.request_code)
        .bind(data.license_id)
        .bind(&data.machine_fingerprint)
        .bind(&data.machine_name)
        .bind(RequestStatus::Pending)
        .bind(data.created_at)
        .bind(data.expires_at)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to create activation request"))
    }

    /// Find a request form by code.
    pub async fn find_request(
        conn: &mut PgConnection,
        request_code: &str,
    ) -> AppResult<Option<ActivationRequestForm>> {
        sqlx::query_as::<_, ActivationRequestForm>(
            "SELECT * FROM activation_requests WHERE request_code = $1",
        )
        .bind(request_code)
        .fetch_optional(conn)
        .await
        .map_err(db_error("Failed to find activation request"))
    }

    /// Find a request form by ID.
    pub async fn find_request_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> AppResult<Option<ActivationRequestForm>> {
        sqlx::query_as::<_, ActivationRequestForm>(
            "SELECT * FROM activation_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(db_error("Failed to find activation request"))
    }

    /// List the request forms on licenses of applications an identity owns.
    pub async fn find_requests_by_owner(
        conn: &mut PgConnection,
        owner_id: Uuid,
    ) -> AppResult<Vec<ActivationRequestForm>> {
        sqlx::query_as::<_, ActivationRequestForm>(
            "SELECT r.* FROM activation_requests r \
             JOIN licenses l ON l.id = r.license_id \
             JOIN applications p ON p.id = l.application_id \
             WHERE p.owner_id = $1 ORDER BY r.created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(conn)
        .await
        .map_err(db_error("Failed to list activation requests"))
    }

    /// Find a request form by code and hold its row lock.
    pub async fn lock_request(
        conn: &mut PgConnection,
        request_code: &str,
    ) -> AppResult<Option<ActivationRequestForm>> {
        sqlx::query_as::<_, ActivationRequestForm>(
            "SELECT * FROM activation_requests WHERE request_code = $1 FOR UPDATE",
        )
        .bind(request_code)
        .fetch_optional(conn)
        .await
        .map_err(db_error("Failed to lock activation request"))
    }

    /// Mark a request form completed.
    pub async fn complete_request(
        conn: &mut PgConnection,
        id: Uuid,
        activation_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE activation_requests SET status = $2, activation_code = $3, completed_at = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(RequestStatus::Completed)
        .bind(activation_code)
        .bind(now)
        .execute(conn)
        .await
        .map_err(db_error("Failed to complete activation request"))?;
        expect_row(result.rows_affected(), "Activation request")
    }

    /// Insert a new activation code.
    pub async fn create_code(
        conn: &mut PgConnection,
        data: CreateOfflineCode,
    ) -> AppResult<OfflineActivationCode> {
        sqlx::query_as::<_, OfflineActivationCode>(
            "INSERT INTO offline_activation_codes (id, license_id, code, machine_fingerprint, \
             is_used, created_at, expires_at) VALUES ($1, $2, $3, $4, FALSE, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.license_id)
        .bind(&data.code)
        .bind(&data.machine_fingerprint)
        .bind(data.created_at)
        .bind(data.expires_at)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to create activation code"))
    }

    /// Find an activation code by value and hold its row lock.
    pub async fn lock_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> AppResult<Option<OfflineActivationCode>> {
        sqlx::query_as::<_, OfflineActivationCode>(
            "SELECT * FROM offline_activation_codes WHERE code = $1 FOR UPDATE",
        )
        .bind(code)
        .fetch_optional(conn)
        .await
        .map_err(db_error("Failed to lock activation code"))
    }

    /// Mark an activation code used.
    pub async fn mark_code_used(
        conn: &mut PgConnection,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE offline_activation_codes SET is_used = TRUE, used_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(now)
        .execute(conn)
        .await
        .map_err(db_error("Failed to mark activation code used"))?;
        expect_row(result.rows_affected(), "Activation code")
    }
}
