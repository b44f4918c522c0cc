use anyhow::{Context, Result, anyhow};
use captionly_db::models::activity::ActivityKind;
use captionly_db::models::profile::Profile;
use captionly_db::repositories::license_repo::LicenseRepository;
use captionly_db::repositories::profile_repo::ProfileRepository;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entitlement::{self, LicenseError, ProfileUpdate, Quota};
use crate::error::AppError;
use crate::services::activity_service::{ActivityLogger, key_hint};

pub const REDEEM_SUCCESS_MESSAGE: &str = "Pro plan activated successfully!";

/// Persists entitlement transitions computed by [`crate::entitlement`].
#[derive(Clone)]
pub struct EntitlementService {
    pool: PgPool,
    profiles: ProfileRepository,
    activity: ActivityLogger,
}

impl EntitlementService {
    pub fn new(pool: PgPool, activity: ActivityLogger) -> Self {
        let profiles = ProfileRepository::new(pool.clone());
        Self {
            pool,
            profiles,
            activity,
        }
    }

    /// Reads a profile and applies the daily-reset and pro-expiry rules,
    /// writing back only when something changed.
    pub async fn load(&self, id: Uuid) -> Result<Option<Profile>> {
        let Some(profile) = self.profiles.get_by_id(id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if entitlement::reconcile(&profile, now).is_empty() {
            return Ok(Some(profile));
        }

        match self.reconcile_locked(id).await {
            Ok(fresh) => Ok(fresh),
            Err(e) => {
                // The reconciled snapshot is still correct for this request;
                // the next read retries the write.
                warn!("Error updating profile {} on load: {:#}", id, e);
                let mut view = profile;
                entitlement::reconcile(&view, now).apply(&mut view);
                Ok(Some(view))
            }
        }
    }

    async fn reconcile_locked(&self, id: Uuid) -> Result<Option<Profile>> {
        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;
        let Some(mut profile) = ProfileRepository::lock_by_id(&mut *tx, id).await? else {
            return Ok(None);
        };

        let update = entitlement::reconcile(&profile, Utc::now());
        if !update.is_empty() {
            let was_pro = profile.is_pro();
            update.apply(&mut profile);
            ProfileRepository::write_entitlement(&mut *tx, &profile).await?;
            if was_pro && !profile.is_pro() {
                info!("Pro plan expired for {}, reverted to free", profile.username);
            }
        }
        tx.commit().await.context("Failed to commit profile reconcile")?;
        Ok(Some(profile))
    }

    pub fn quota(&self, profile: &Profile) -> Quota {
        entitlement::evaluate_quota(profile, Utc::now())
    }

    /// Takes one generation slot from today's quota. Runs against the
    /// locked row, so concurrent requests cannot overspend the limit.
    /// Returns the day the slot was taken on, for [`Self::release_generation`].
    pub async fn reserve_generation(&self, profile: &mut Profile) -> Result<NaiveDate, AppError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start generation transaction")?;
        let mut locked = ProfileRepository::lock_by_id(&mut *tx, profile.id)
            .await?
            .ok_or_else(|| anyhow!("profile {} no longer exists", profile.id))?;

        if !entitlement::evaluate_quota(&locked, now).can_generate {
            entitlement::reconcile(&locked, now).apply(&mut locked);
            *profile = locked;
            return Err(AppError::QuotaExceeded);
        }

        entitlement::record_generation(&locked, now).apply(&mut locked);
        ProfileRepository::write_entitlement(&mut *tx, &locked).await?;
        tx.commit()
            .await
            .context("Failed to commit generation slot")?;

        *profile = locked;
        Ok(entitlement::today(now))
    }

    /// Hands back a slot when the model produced nothing.
    pub async fn release_generation(&self, profile: &mut Profile, reserved_on: NaiveDate) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;
        let Some(mut locked) = ProfileRepository::lock_by_id(&mut *tx, profile.id).await? else {
            return Ok(());
        };

        let update = entitlement::release_generation(&locked, reserved_on);
        if !update.is_empty() {
            update.apply(&mut locked);
            ProfileRepository::write_entitlement(&mut *tx, &locked).await?;
        }
        tx.commit()
            .await
            .context("Failed to commit generation release")?;

        *profile = locked;
        Ok(())
    }

    pub fn log_generation(&self, profile: &Profile) {
        self.activity.record(ActivityLogger::entry(
            profile,
            ActivityKind::CaptionGeneration,
            None,
        ));
    }

    /// Validates and redeems a license key. The profile upgrade and the
    /// license status change commit together or not at all.
    pub async fn redeem_license(&self, profile: &mut Profile, key: &str) -> Result<(), AppError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::Validation("Please enter a license key.".to_string()));
        }

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start redemption transaction")?;

        // license first, then profile; no other path holds both
        let license = LicenseRepository::lock_by_key(&mut *tx, key).await?;
        let update = entitlement::redeem_license(license.as_ref(), now)?;
        let license_id = license.map(|l| l.id).ok_or(LicenseError::NotFound)?;

        let mut locked = ProfileRepository::lock_by_id(&mut *tx, profile.id)
            .await?
            .ok_or_else(|| anyhow!("profile {} no longer exists", profile.id))?;
        entitlement::reconcile(&locked, now)
            .merge(update)
            .apply(&mut locked);

        ProfileRepository::write_entitlement(&mut *tx, &locked).await?;
        LicenseRepository::mark_used_with(&mut *tx, license_id).await?;
        tx.commit()
            .await
            .context("Failed to commit license redemption")?;

        *profile = locked;
        info!("License redeemed by {}", profile.username);
        self.activity.record(ActivityLogger::entry(
            profile,
            ActivityKind::ProPlanActivatedKey,
            Some(key_hint(key)),
        ));
        Ok(())
    }

    /// Applies an admin-side change to another profile. `decide` sees the
    /// locked, reconciled row.
    pub async fn apply_admin_update<F>(&self, id: Uuid, decide: F) -> Result<Option<Profile>>
    where
        F: FnOnce(&Profile, DateTime<Utc>) -> ProfileUpdate,
    {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;
        let Some(mut target) = ProfileRepository::lock_by_id(&mut *tx, id).await? else {
            return Ok(None);
        };

        entitlement::reconcile(&target, now).apply(&mut target);
        decide(&target, now).apply(&mut target);
        ProfileRepository::write_entitlement(&mut *tx, &target).await?;
        tx.commit().await.context("Failed to commit admin update")?;
        Ok(Some(target))
    }
}
