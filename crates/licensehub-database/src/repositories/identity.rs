//! Identity repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use licensehub_core::result::AppResult;
use licensehub_entity::identity::{BusinessRole, CreateIdentity, Identity, SystemRole};

use super::{db_error, expect_row};

/// Repository for the `identities` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRepository;

impl IdentityRepository {
    /// Insert a new identity.
    pub async fn create(
        conn: &mut PgConnection,
        data: CreateIdentity,
        now: DateTime<Utc>,
    ) -> AppResult<Identity> {
        sqlx::query_as::<_, Identity>(
            "INSERT INTO identities (id, username, email, full_name, password_hash, \
             business_role, system_role, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.full_name)
        .bind(&data.password_hash)
        .bind(data.business_role)
        .bind(data.system_role)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to create identity"))
    }

    /// Find an identity by ID.
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Identity>> {
        sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to find identity"))
    }

    /// Find an identity by username.
    pub async fn find_by_username(
        conn: &mut PgConnection,
        username: &str,
    ) -> AppResult<Option<Identity>> {
        sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE username = $1")
            .bind(username)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to find identity by username"))
    }

    /// Replace the password hash.
    pub async fn update_password(
        conn: &mut PgConnection,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE identities SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .bind(now)
                .execute(conn)
                .await
                .map_err(db_error("Failed to update password"))?;
        expect_row(result.rows_affected(), "Identity")
    }

    /// Replace both roles.
    pub async fn update_roles(
        conn: &mut PgConnection,
        id: Uuid,
        business_role: BusinessRole,
        system_role: SystemRole,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE identities SET business_role = $2, system_role = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(business_role)
        .bind(system_role)
        .bind(now)
        .execute(conn)
        .await
        .map_err(db_error("Failed to update roles"))?;
        expect_row(result.rows_affected(), "Identity")
    }

    /// Set the active flag.
    pub async fn set_active(
        conn: &mut PgConnection,
        id: Uuid,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE identities SET is_active = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(is_active)
                .bind(now)
                .execute(conn)
                .await
                .map_err(db_error("Failed to update identity status"))?;
        expect_row(result.rows_affected(), "Identity")
    }
}
