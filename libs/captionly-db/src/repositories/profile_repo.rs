use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::profile::{NewProfile, Plan, Profile};

const PROFILE_COLUMNS: &str = "id, username, email, password_hash, is_admin, email_confirmed_at, plan, \
     generations_today, last_generation_date, license_key, pro_expires_at, created_at";

#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_profile(row: &PgRow) -> Result<Profile> {
        let plan: String = row.try_get("plan")?;
        Ok(Profile {
            id: row.try_get::<Uuid, _>("id")?,
            username: row.try_get::<String, _>("username")?,
            email: row.try_get::<String, _>("email")?,
            password_hash: row.try_get::<String, _>("password_hash")?,
            is_admin: row.try_get::<bool, _>("is_admin")?,
            email_confirmed_at: row.try_get::<Option<DateTime<Utc>>, _>("email_confirmed_at")?,
            plan: plan.parse::<Plan>()?,
            generations_today: row.try_get::<i32, _>("generations_today")?,
            last_generation_date: row.try_get::<NaiveDate, _>("last_generation_date")?,
            license_key: row.try_get::<Option<String>, _>("license_key")?,
            pro_expires_at: row.try_get::<Option<DateTime<Utc>>, _>("pro_expires_at")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    pub async fn get_all(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM profiles ORDER BY username ASC",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch profiles")?;
        rows.iter().map(Self::row_to_profile).collect()
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch profile by ID")?;
        row.as_ref().map(Self::row_to_profile).transpose()
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM profiles WHERE email = $1",
            PROFILE_COLUMNS
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch profile by email")?;
        row.as_ref().map(Self::row_to_profile).transpose()
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM profiles WHERE email = $1)")
            .bind(email.trim().to_lowercase())
            .fetch_one(&self.pool)
            .await
            .context("Failed to check email")
    }

    pub async fn create(&self, new: &NewProfile) -> Result<Profile> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO profiles (id, username, email, password_hash, is_admin, email_confirmed_at)
            VALUES ($1, $2, $3, $4, $5, CASE WHEN $6 THEN now() ELSE NULL END)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(new.username.trim())
        .bind(new.email.trim().to_lowercase())
        .bind(&new.password_hash)
        .bind(new.is_admin)
        .bind(new.email_confirmed)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create profile")?;
        Self::row_to_profile(&row)
    }

    /// Row-locking lookup. Entitlement writes re-read the profile through
    /// this inside a transaction so concurrent requests serialise on the row.
    pub async fn lock_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Profile>>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query(&format!(
            "SELECT {} FROM profiles WHERE id = $1 FOR UPDATE",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to lock profile")?;
        row.as_ref().map(Self::row_to_profile).transpose()
    }

    /// Writes the entitlement columns of `profile`. The snapshot must come
    /// from [`Self::lock_by_id`] in the same transaction.
    pub async fn write_entitlement<'e, E>(executor: E, profile: &Profile) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE profiles SET
                plan = $1,
                generations_today = $2,
                last_generation_date = $3,
                license_key = $4,
                pro_expires_at = $5
            WHERE id = $6
            "#,
        )
        .bind(profile.plan.as_str())
        .bind(profile.generations_today)
        .bind(profile.last_generation_date)
        .bind(profile.license_key.as_deref())
        .bind(profile.pro_expires_at)
        .bind(profile.id)
        .execute(executor)
        .await
        .context("Failed to update profile entitlement")?;
        Ok(())
    }

    pub async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE profiles SET password_hash = $1 WHERE email = $2")
            .bind(password_hash)
            .bind(email.trim().to_lowercase())
            .execute(&self.pool)
            .await
            .context("Failed to update password")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn confirm_email(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE profiles SET email_confirmed_at = COALESCE(email_confirmed_at, now()) WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to confirm email")?;
        Ok(())
    }

    pub async fn count_admins(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE is_admin = TRUE")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count admins")
    }
}
