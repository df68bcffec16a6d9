//! Application repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use licensehub_core::result::AppResult;
use licensehub_entity::application::{Application, CreateApplication};

use super::db_error;

/// Repository for the `applications` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationRepository;

impl ApplicationRepository {
    /// Insert a new application.
    pub async fn create(
        conn: &mut PgConnection,
        data: CreateApplication,
        now: DateTime<Utc>,
    ) -> AppResult<Application> {
        sqlx::query_as::<_, Application>(
            "INSERT INTO applications (id, owner_id, name, version, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.owner_id)
        .bind(&data.name)
        .bind(&data.version)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to create application"))
    }

    /// Find an application by ID.
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Application>> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(db_error("Failed to find application"))
    }
}
