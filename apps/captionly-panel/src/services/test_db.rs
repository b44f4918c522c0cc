//! Postgres fixtures for service tests. Tests that use them return early
//! when `DATABASE_URL` is not set.

use captionly_db::init_db;
use captionly_db::models::license::License;
use captionly_db::models::profile::{NewProfile, Profile};
use captionly_db::repositories::license_repo::LicenseRepository;
use captionly_db::repositories::profile_repo::ProfileRepository;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::services::license_service::generate_key;

pub async fn pool() -> Option<PgPool> {
    let _ = dotenvy::dotenv();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };
    Some(init_db(&url).await.expect("test database should be reachable"))
}

pub async fn free_profile(pool: &PgPool) -> Profile {
    let tag = Uuid::new_v4().simple().to_string();
    ProfileRepository::new(pool.clone())
        .create(&NewProfile {
            username: format!("user-{}", &tag[..12]),
            email: format!("{}@example.com", tag),
            password_hash: "not-a-hash".to_string(),
            is_admin: false,
            email_confirmed: true,
        })
        .await
        .unwrap()
}

pub async fn active_license(pool: &PgPool, days: i64) -> License {
    LicenseRepository::new(pool.clone())
        .create(&generate_key(), Utc::now() + Duration::days(days))
        .await
        .unwrap()
}

pub async fn reread(pool: &PgPool, id: Uuid) -> Profile {
    ProfileRepository::new(pool.clone())
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
}
