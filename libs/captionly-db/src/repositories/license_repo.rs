use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};

use crate::models::license::{License, LicenseStatus};

const LICENSE_COLUMNS: &str = "id, key, expires_at, status, created_at, redeemed_at";

#[derive(Clone, Debug)]
pub struct LicenseRepository {
    pool: PgPool,
}

impl LicenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_license(row: &PgRow) -> Result<License> {
        let status: String = row.try_get("status")?;
        Ok(License {
            id: row.try_get("id")?,
            key: row.try_get("key")?,
            expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
            status: status.parse::<LicenseStatus>()?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            redeemed_at: row.try_get::<Option<DateTime<Utc>>, _>("redeemed_at")?,
        })
    }

    pub async fn create(&self, key: &str, expires_at: DateTime<Utc>) -> Result<License> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO licenses (key, expires_at, status)
            VALUES ($1, $2, 'active')
            RETURNING {}
            "#,
            LICENSE_COLUMNS
        ))
        .bind(key)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create license")?;
        Self::row_to_license(&row)
    }

    pub async fn get_all(&self) -> Result<Vec<License>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM licenses ORDER BY created_at DESC",
            LICENSE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch licenses")?;
        rows.iter().map(Self::row_to_license).collect()
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<License>> {
        let row = sqlx::query(&format!("SELECT {} FROM licenses WHERE id = $1", LICENSE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch license by ID")?;
        row.as_ref().map(Self::row_to_license).transpose()
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Option<License>> {
        let row = sqlx::query(&format!("SELECT {} FROM licenses WHERE key = $1", LICENSE_COLUMNS))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch license by key")?;
        row.as_ref().map(Self::row_to_license).transpose()
    }

    /// Row-locking lookup for use inside a redemption transaction.
    pub async fn lock_by_key<'e, E>(executor: E, key: &str) -> Result<Option<License>>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query(&format!(
            "SELECT {} FROM licenses WHERE key = $1 FOR UPDATE",
            LICENSE_COLUMNS
        ))
        .bind(key)
        .fetch_optional(executor)
        .await
        .context("Failed to lock license by key")?;
        row.as_ref().map(Self::row_to_license).transpose()
    }

    pub async fn mark_used_with<'e, E>(executor: E, id: i64) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE licenses SET status = 'used', redeemed_at = COALESCE(redeemed_at, now()) WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await
        .context("Failed to mark license used")?;
        Ok(())
    }

    /// Moves a license from `from` to `to`. Returns false when the row no
    /// longer has status `from`.
    pub async fn compare_and_set_status(
        &self,
        id: i64,
        from: LicenseStatus,
        to: LicenseStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE licenses SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to update license status")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM licenses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete license")?;
        Ok(result.rows_affected() > 0)
    }
}
