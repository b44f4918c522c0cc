use anyhow::Result;
use captionly_db::models::activity::{ActivityKind, NewActivity};
use captionly_db::models::license::License;
use captionly_db::models::profile::Profile;
use captionly_db::repositories::license_repo::LicenseRepository;
use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::activity_service::{ActivityLogger, key_hint};

pub const DEFAULT_LICENSE_DAYS: i64 = 30;
pub const MAX_LICENSE_DAYS: i64 = 3650;

pub fn generate_key() -> String {
    format!("PRO-{}", Uuid::new_v4().to_string().to_uppercase())
}

/// Admin-side license issuance and lifecycle.
#[derive(Clone)]
pub struct LicenseService {
    licenses: LicenseRepository,
    activity: ActivityLogger,
}

impl LicenseService {
    pub fn new(licenses: LicenseRepository, activity: ActivityLogger) -> Self {
        Self { licenses, activity }
    }

    pub async fn list(&self) -> Result<Vec<License>> {
        self.licenses.get_all().await
    }

    pub async fn generate(&self, actor: &Profile, days: i64) -> Result<License, AppError> {
        if days < 1 {
            return Err(AppError::Validation(
                "Duration must be at least 1 day.".to_string(),
            ));
        }
        if days > MAX_LICENSE_DAYS {
            return Err(AppError::Validation(format!(
                "Duration must be at most {} days.",
                MAX_LICENSE_DAYS
            )));
        }

        let key = generate_key();
        let expires_at = Utc::now() + Duration::days(days);
        let license = self.licenses.create(&key, expires_at).await?;

        info!("License generated by {} for {} days", actor.username, days);
        self.audit(
            actor,
            ActivityKind::LicenseCreatedAdmin,
            format!("{} ({} days)", key_hint(&license.key), days),
        );
        Ok(license)
    }

    /// Flips a key between active and revoked. A key that was ever redeemed
    /// moves between used and revoked instead.
    pub async fn toggle(&self, actor: &Profile, id: i64) -> Result<License, AppError> {
        let mut license = self
            .licenses
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::Validation("License not found.".to_string()))?;

        let next = license.toggled_status();
        if !self
            .licenses
            .compare_and_set_status(id, license.status, next)
            .await?
        {
            return Err(AppError::Validation(
                "License changed in the meantime, reload and try again.".to_string(),
            ));
        }
        self.audit(
            actor,
            ActivityKind::LicenseStatusAdmin,
            format!("{} {} -> {}", key_hint(&license.key), license.status, next),
        );
        license.status = next;
        Ok(license)
    }

    pub async fn delete(&self, actor: &Profile, id: i64) -> Result<(), AppError> {
        let Some(license) = self.licenses.get_by_id(id).await? else {
            return Err(AppError::Validation("License not found.".to_string()));
        };
        if self.licenses.delete(id).await? {
            self.audit(actor, ActivityKind::LicenseDeletedAdmin, key_hint(&license.key));
        }
        Ok(())
    }

    fn audit(&self, actor: &Profile, kind: ActivityKind, details: String) {
        self.activity.record(NewActivity {
            user_id: Some(actor.id),
            username: actor.username.clone(),
            kind,
            details: Some(details),
        });
    }
}
