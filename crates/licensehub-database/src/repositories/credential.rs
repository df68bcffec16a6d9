//! Session and API token repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use sqlx::types::Json;
use uuid::Uuid;

use licensehub_core::result::AppResult;
use licensehub_entity::credential::{
    CreateApiToken, CreateSession, ScopedCredential, SessionCredential, UpdateApiToken,
};

use super::{db_error, expect_row};

/// Repository for the `sessions` and `api_tokens` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialRepository;

impl CredentialRepository {
    /// Insert a new session.
    pub async fn create_session(
        conn: &mut PgConnection,
        data: CreateSession,
    ) -> AppResult<SessionCredential> {
        sqlx::query_as::<_, SessionCredential>(
            "INSERT INTO sessions (id, identity_id, token_hash, is_revoked, expires_at, \
             created_at, last_activity) VALUES ($1, $2, $3, FALSE, $4, $5, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.identity_id)
        .bind(&data.token_hash)
        .bind(data.expires_at)
        .bind(data.created_at)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to create session"))
    }

    /// Find a session by token hash.
    pub async fn find_session_by_hash(
        conn: &mut PgConnection,
        token_hash: &str,
    ) -> AppResult<Option<SessionCredential>> {
        sqlx::query_as::<_, SessionCredential>("SELECT * FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to find session by token"))
    }

    /// Update session last activity.
    pub async fn touch_session(
        conn: &mut PgConnection,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query("UPDATE sessions SET last_activity = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(conn)
            .await
            .map_err(db_error("Failed to update session activity"))?;
        expect_row(result.rows_affected(), "Session")
    }

    /// Revoke a session.
    pub async fn revoke_session(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("UPDATE sessions SET is_revoked = TRUE WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(db_error("Failed to revoke session"))?;
        expect_row(result.rows_affected(), "Session")
    }

    /// Revoke all live sessions of an identity.
    pub async fn revoke_sessions_for_identity(
        conn: &mut PgConnection,
        identity_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_revoked = TRUE WHERE identity_id = $1 AND is_revoked = FALSE",
        )
        .bind(identity_id)
        .execute(conn)
        .await
        .map_err(db_error("Failed to revoke sessions"))?;
        Ok(result.rows_affected())
    }

    /// Insert a new API token.
    pub async fn create_api_token(
        conn: &mut PgConnection,
        data: CreateApiToken,
    ) -> AppResult<ScopedCredential> {
        sqlx::query_as::<_, ScopedCredential>(
            "INSERT INTO api_tokens (id, identity_id, name, token_hash, scopes, is_active, \
             expires_at, created_at) VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.identity_id)
        .bind(&data.name)
        .bind(&data.token_hash)
        .bind(Json(&data.scopes))
        .bind(data.expires_at)
        .bind(data.created_at)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to create API token"))
    }

    /// Find an API token by ID.
    pub async fn find_api_token(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> AppResult<Option<ScopedCredential>> {
        sqlx::query_as::<_, ScopedCredential>("SELECT * FROM api_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to find API token"))
    }

    /// Find an API token by token hash.
    pub async fn find_api_token_by_hash(
        conn: &mut PgConnection,
        token_hash: &str,
    ) -> AppResult<Option<ScopedCredential>> {
        sqlx::query_as::<_, ScopedCredential>("SELECT * FROM api_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to find API token by hash"))
    }

    /// List the API tokens of an identity.
    pub async fn list_api_tokens(
        conn: &mut PgConnection,
        identity_id: Uuid,
    ) -> AppResult<Vec<ScopedCredential>> {
        sqlx::query_as::<_, ScopedCredential>(
            "SELECT * FROM api_tokens WHERE identity_id = $1 ORDER BY created_at DESC",
        )
        .bind(identity_id)
        .fetch_all(conn)
        .await
        .map_err(db_error("Failed to list API tokens"))
    }

    /// Apply holder-editable changes to an API token.
    pub async fn update_api_token(
        conn: &mut PgConnection,
        id: Uuid,
        changes: UpdateApiToken,
    ) -> AppResult<Option<ScopedCredential>> {
        sqlx::query_as::<_, ScopedCredential>(
            "UPDATE api_tokens SET name = COALESCE($2, name), scopes = COALESCE($3, scopes), \
             is_active = COALESCE($4, is_active) WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.scopes.map(Json))
        .bind(changes.is_active)
        .fetch_optional(conn)
        .await
        .map_err(db_error("Failed to update API token"))
    }

    /// Update API token last use.
    pub async fn touch_api_token(
        conn: &mut PgConnection,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query("UPDATE api_tokens SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(conn)
            .await
            .map_err(db_error("Failed to update API token usage"))?;
        expect_row(result.rows_affected(), "API token")
    }

    /// Delete an API token.
    pub async fn delete_api_token(conn: &mut PgConnection, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM api_tokens WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(db_error("Failed to delete API token"))?;
        Ok(result.rows_affected() > 0)
    }
}
