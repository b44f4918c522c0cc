use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::activity::{ActivityLogEntry, NewActivity};

#[derive(Clone, Debug)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the raw driver error so callers can tell a missing table
    /// apart from other failures.
    pub async fn insert(&self, entry: &NewActivity) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO activity_log (user_id, username, activity_type, details) VALUES ($1, $2, $3, $4)",
        )
        .bind(entry.user_id)
        .bind(&entry.username)
        .bind(entry.kind.as_str())
        .bind(entry.details.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_latest(&self, limit: i64) -> Result<Vec<ActivityLogEntry>> {
        sqlx::query_as::<_, ActivityLogEntry>(
            r#"
            SELECT id, user_id, username, activity_type, details, created_at
            FROM activity_log
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch activity log")
    }
}
