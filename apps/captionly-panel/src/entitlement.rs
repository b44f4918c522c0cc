//! Plan, quota and license state transitions.
//!
//! Everything here is pure: functions take a profile snapshot and the
//! current time and return a [`ProfileUpdate`] describing the fields to
//! change. Persisting the update is the job of
//! [`crate::services::entitlement_service::EntitlementService`].

use captionly_db::models::license::{License, LicenseStatus};
use captionly_db::models::profile::{Plan, Profile};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

pub const FREE_DAILY_LIMIT: i32 = 3;
pub const PRO_DAILY_LIMIT: i32 = 10;
pub const ADMIN_GRANT_DAYS: i64 = 30;

pub fn daily_limit(plan: Plan) -> i32 {
    match plan {
        Plan::Free => FREE_DAILY_LIMIT,
        Plan::Pro => PRO_DAILY_LIMIT,
    }
}

/// Calendar day used for the daily counter. Days roll over at UTC midnight.
pub fn today(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quota {
    pub limit: i32,
    pub remaining: i32,
    pub can_generate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LicenseError {
    #[error("License key not found.")]
    NotFound,
    #[error("This license key has been revoked.")]
    Revoked,
    #[error("This license key has expired.")]
    Expired,
    #[error("This license key has already been used.")]
    AlreadyUsed,
}

/// Field-level changes to a profile. `None` leaves a field untouched; for
/// nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub plan: Option<Plan>,
    pub generations_today: Option<i32>,
    pub last_generation_date: Option<NaiveDate>,
    pub license_key: Option<Option<String>>,
    pub pro_expires_at: Option<Option<DateTime<Utc>>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.plan.is_none()
            && self.generations_today.is_none()
            && self.last_generation_date.is_none()
            && self.license_key.is_none()
            && self.pro_expires_at.is_none()
    }

    pub fn apply(&self, profile: &mut Profile) {
        if let Some(plan) = self.plan {
            profile.plan = plan;
        }
        if let Some(count) = self.generations_today {
            profile.generations_today = count;
        }
        if let Some(date) = self.last_generation_date {
            profile.last_generation_date = date;
        }
        if let Some(key) = &self.license_key {
            profile.license_key = key.clone();
        }
        if let Some(expiry) = self.pro_expires_at {
            profile.pro_expires_at = expiry;
        }
    }

    /// Combines two updates; fields set in `later` win.
    pub fn merge(self, later: ProfileUpdate) -> ProfileUpdate {
        ProfileUpdate {
            plan: later.plan.or(self.plan),
            generations_today: later.generations_today.or(self.generations_today),
            last_generation_date: later.last_generation_date.or(self.last_generation_date),
            license_key: later.license_key.or(self.license_key),
            pro_expires_at: later.pro_expires_at.or(self.pro_expires_at),
        }
    }

    fn demote() -> ProfileUpdate {
        ProfileUpdate {
            plan: Some(Plan::Free),
            license_key: Some(None),
            pro_expires_at: Some(None),
            ..Default::default()
        }
    }
}

/// Applies the daily reset and the pro-expiry rules. Returns an empty update
/// when the profile is already consistent with `now`.
pub fn reconcile(profile: &Profile, now: DateTime<Utc>) -> ProfileUpdate {
    let mut update = ProfileUpdate::default();
    let today = today(now);

    if profile.last_generation_date != today {
        update.generations_today = Some(0);
        update.last_generation_date = Some(today);
    }

    let pro_lapsed = match profile.pro_expires_at {
        Some(expiry) => now > expiry,
        // a pro row without an expiry cannot be honoured
        None => true,
    };
    if profile.plan == Plan::Pro && pro_lapsed {
        update = update.merge(ProfileUpdate::demote());
    }

    update
}

fn reconciled(profile: &Profile, now: DateTime<Utc>) -> Profile {
    let mut view = profile.clone();
    reconcile(profile, now).apply(&mut view);
    view
}

pub fn evaluate_quota(profile: &Profile, now: DateTime<Utc>) -> Quota {
    let view = reconciled(profile, now);
    let limit = daily_limit(view.plan);
    let remaining = (limit - view.generations_today).max(0);
    Quota {
        limit,
        remaining,
        can_generate: remaining > 0,
    }
}

/// Counts one generation against today's quota.
pub fn record_generation(profile: &Profile, now: DateTime<Utc>) -> ProfileUpdate {
    let view = reconciled(profile, now);
    reconcile(profile, now).merge(ProfileUpdate {
        generations_today: Some(view.generations_today + 1),
        last_generation_date: Some(today(now)),
        ..Default::default()
    })
}

/// Gives back a slot taken by [`record_generation`] on `reserved_on`. A slot
/// from an earlier day has already been wiped by the daily reset.
pub fn release_generation(profile: &Profile, reserved_on: NaiveDate) -> ProfileUpdate {
    if profile.last_generation_date != reserved_on || profile.generations_today <= 0 {
        return ProfileUpdate::default();
    }
    ProfileUpdate {
        generations_today: Some(profile.generations_today - 1),
        ..Default::default()
    }
}

/// Validates a license for redemption. Checks run in a fixed order so a
/// revoked key reports as revoked even when it is also expired or used.
pub fn redeem_license(
    license: Option<&License>,
    now: DateTime<Utc>,
) -> Result<ProfileUpdate, LicenseError> {
    let license = license.ok_or(LicenseError::NotFound)?;

    if license.status == LicenseStatus::Revoked {
        return Err(LicenseError::Revoked);
    }
    if license.is_expired_at(now) {
        return Err(LicenseError::Expired);
    }
    if license.status == LicenseStatus::Used {
        return Err(LicenseError::AlreadyUsed);
    }

    Ok(ProfileUpdate {
        plan: Some(Plan::Pro),
        license_key: Some(Some(license.key.clone())),
        pro_expires_at: Some(Some(license.expires_at)),
        ..Default::default()
    })
}

pub fn grant_pro(now: DateTime<Utc>, days: i64) -> ProfileUpdate {
    ProfileUpdate {
        plan: Some(Plan::Pro),
        license_key: Some(None),
        pro_expires_at: Some(Some(now + Duration::days(days))),
        ..Default::default()
    }
}

pub fn revoke_pro() -> ProfileUpdate {
    ProfileUpdate::demote()
}

pub fn reset_generations(now: DateTime<Utc>) -> ProfileUpdate {
    ProfileUpdate {
        generations_today: Some(0),
        last_generation_date: Some(today(now)),
        ..Default::default()
    }
}
