use anyhow::{Context, Result};
use captionly_db::models::activity::ActivityKind;
use captionly_db::models::profile::Profile;
use captionly_db::repositories::profile_repo::ProfileRepository;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::activity_service::ActivityLogger;

pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Covers unknown email and wrong password alike.
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Please check your inbox and confirm your email address before logging in.")]
    EmailNotConfirmed,
    #[error("You must be logged in.")]
    Unauthorized,
    #[error("Admin access required.")]
    Forbidden,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // profile UUID
    pub exp: usize,
    pub role: String, // "user" | "admin"
}

impl Claims {
    pub fn profile_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

#[derive(Clone)]
pub struct AuthService {
    profiles: ProfileRepository,
    activity: ActivityLogger,
    session_secret: String,
}

impl AuthService {
    pub fn new(profiles: ProfileRepository, activity: ActivityLogger, session_secret: String) -> Self {
        Self {
            profiles,
            activity,
            session_secret,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(String, Profile), AppError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Email and password are required.".to_string()));
        }

        let found = self.profiles.get_by_email(email).await?;
        let password_ok = check_password(password, found.as_ref().map(|p| p.password_hash.as_str()));
        let Some(profile) = found else {
            warn!("Login failed: no profile for submitted email");
            return Err(AuthError::InvalidCredentials.into());
        };
        if !password_ok {
            warn!("Login failed for {}: bad password", profile.username);
            return Err(AuthError::InvalidCredentials.into());
        }

        if !profile.is_email_confirmed() {
            return Err(AuthError::EmailNotConfirmed.into());
        }

        let token = self.issue_token(&profile)?;
        info!("Creating session for user: '{}'", profile.username);
        self.activity
            .record(ActivityLogger::entry(&profile, ActivityKind::UserLogin, None));

        Ok((token, profile))
    }

    pub fn issue_token(&self, profile: &Profile) -> Result<String> {
        let expiration = chrono::Utc::now()
            .checked_add_signed(chrono::Duration::days(SESSION_TTL_DAYS))
            .context("session expiry overflow")?
            .timestamp() as usize;

        let claims = Claims {
            sub: profile.id.to_string(),
            exp: expiration,
            role: if profile.is_admin { "admin" } else { "user" }.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.session_secret.as_bytes()),
        )
        .context("Failed to sign session token")
    }

    pub fn verify_token(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.session_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .ok()
        .map(|data| data.claims)
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).context("Failed to hash password")
}

/// Same cost as real hashes, so an unknown email takes as long as a wrong
/// password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| bcrypt::hash("captionly-no-such-user", bcrypt::DEFAULT_COST).ok());

/// Runs one bcrypt verification whether or not the account exists.
fn check_password(password: &str, stored: Option<&str>) -> bool {
    let Some(hash) = stored.or(DUMMY_HASH.as_deref()) else {
        return false;
    };
    let matches = bcrypt::verify(password, hash).unwrap_or(false);
    stored.is_some() && matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use captionly_db::models::profile::Plan;
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        AuthService::new(
            ProfileRepository::new(pool.clone()),
            ActivityLogger::new(pool),
            secret.to_string(),
        )
    }

    fn profile(is_admin: bool) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            username: "sokha".to_string(),
            email: "sokha@example.com".to_string(),
            password_hash: String::new(),
            is_admin,
            email_confirmed_at: Some(Utc::now()),
            plan: Plan::Free,
            generations_today: 0,
            last_generation_date: Utc::now().date_naive(),
            license_key: None,
            pro_expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn token_round_trip_carries_profile_and_role() {
        let auth = service("secret-a");
        let admin = profile(true);
        let token = auth.issue_token(&admin).unwrap();

        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.profile_id(), Some(admin.id));
        assert_eq!(claims.role, "admin");
    }

    #[tokio::test]
    async fn token_from_other_secret_is_rejected() {
        let token = service("secret-a").issue_token(&profile(false)).unwrap();
        assert!(service("secret-b").verify_token(&token).is_none());
        assert!(service("secret-a").verify_token("garbage").is_none());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (Utc::now().timestamp() - 3600) as usize,
            role: "user".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret-a"),
        )
        .unwrap();
        assert!(service("secret-a").verify_token(&token).is_none());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(bcrypt::verify("hunter22", &hash).unwrap());
        assert!(!bcrypt::verify("hunter23", &hash).unwrap());
    }

    #[test]
    fn unknown_account_still_runs_a_verification() {
        let dummy = DUMMY_HASH.as_deref().unwrap();
        assert!(bcrypt::verify("anything", dummy).is_ok());
        assert!(!check_password("captionly-no-such-user", None));
    }

    #[test]
    fn check_password_matches_stored_hash() {
        let hash = hash_password("hunter22").unwrap();
        assert!(check_password("hunter22", Some(&hash)));
        assert!(!check_password("hunter23", Some(&hash)));
    }
}
