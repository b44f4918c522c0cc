use anyhow::Result;
use captionly_db::models::activity::{ActivityKind, NewActivity};
use captionly_db::models::profile::{NewProfile, Profile};
use captionly_db::repositories::profile_repo::ProfileRepository;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::entitlement::{self, ADMIN_GRANT_DAYS};
use crate::error::AppError;
use crate::services::activity_service::ActivityLogger;
use crate::services::auth_service::hash_password;
use crate::services::entitlement_service::EntitlementService;

#[derive(Debug, Clone, Default)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
    pub require_confirmation: bool,
}

/// Profile administration. Every mutation leaves an audit entry naming the
/// acting admin.
#[derive(Clone)]
pub struct UserService {
    profiles: ProfileRepository,
    entitlements: EntitlementService,
    activity: ActivityLogger,
}

impl UserService {
    pub fn new(
        profiles: ProfileRepository,
        entitlements: EntitlementService,
        activity: ActivityLogger,
    ) -> Self {
        Self {
            profiles,
            entitlements,
            activity,
        }
    }

    /// All profiles by username, shown as of `now` without writing back.
    pub async fn list(&self) -> Result<Vec<Profile>> {
        let now = Utc::now();
        let mut profiles = self.profiles.get_all().await?;
        for profile in &mut profiles {
            entitlement::reconcile(profile, now).apply(profile);
        }
        Ok(profiles)
    }

    pub async fn create_user(
        &self,
        actor: Option<&Profile>,
        input: CreateUser,
    ) -> Result<Profile, AppError> {
        let username = input.username.trim();
        let email = input.email.trim();
        if username.is_empty() || email.is_empty() || input.password.is_empty() {
            return Err(AppError::Validation(
                "Username, email and password are required.".to_string(),
            ));
        }
        if self.profiles.email_exists(email).await? {
            return Err(AppError::Validation(format!(
                "A user with email {} already exists.",
                email
            )));
        }

        let profile = self
            .profiles
            .create(&NewProfile {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: hash_password(&input.password)?,
                is_admin: input.is_admin,
                email_confirmed: !input.require_confirmation,
            })
            .await?;

        info!("Created user {} ({})", profile.username, profile.email);
        let entry = audit_entry(
            actor,
            &profile,
            ActivityKind::UserCreatedAdmin,
            format!("Created {}", profile.email),
        );
        match actor {
            Some(_) => self.activity.record(entry),
            // the CLI exits right after, so wait for the write
            None => self.activity.write(entry).await,
        }
        Ok(profile)
    }

    /// Grants a 30-day pro plan to a free profile, or revokes pro from a
    /// pro profile. The choice is made on the current row.
    pub async fn toggle_pro(&self, actor: &Profile, id: Uuid) -> Result<Profile, AppError> {
        let target = self
            .entitlements
            .apply_admin_update(id, |current, now| {
                if current.is_pro() {
                    entitlement::revoke_pro()
                } else {
                    entitlement::grant_pro(now, ADMIN_GRANT_DAYS)
                }
            })
            .await?
            .ok_or_else(not_found)?;

        let kind = if target.is_pro() {
            ActivityKind::ProPlanGrantedAdmin
        } else {
            ActivityKind::ProPlanRevokedAdmin
        };
        info!("{} for {} by {}", kind.label(), target.username, actor.username);
        self.activity.record(audit_entry(
            Some(actor),
            &target,
            kind,
            format!("By Admin: {}", actor.email),
        ));
        Ok(target)
    }

    pub async fn reset_generations(&self, actor: &Profile, id: Uuid) -> Result<Profile, AppError> {
        let target = self
            .entitlements
            .apply_admin_update(id, |_, now| entitlement::reset_generations(now))
            .await?
            .ok_or_else(not_found)?;
        self.activity.record(audit_entry(
            Some(actor),
            &target,
            ActivityKind::GenerationsResetAdmin,
            format!("By Admin: {}", actor.email),
        ));
        Ok(target)
    }

    pub async fn confirm_email(&self, actor: &Profile, id: Uuid) -> Result<(), AppError> {
        let target = self.require(id).await?;
        self.profiles.confirm_email(target.id).await?;
        info!("Email confirmed for {} by {}", target.email, actor.username);
        self.activity.record(audit_entry(
            Some(actor),
            &target,
            ActivityKind::EmailConfirmedAdmin,
            format!("By Admin: {}", actor.email),
        ));
        Ok(())
    }

    async fn require(&self, id: Uuid) -> Result<Profile, AppError> {
        self.entitlements.load(id).await?.ok_or_else(not_found)
    }
}

fn not_found() -> AppError {
    AppError::Validation("User not found.".to_string())
}

fn audit_entry(
    actor: Option<&Profile>,
    target: &Profile,
    kind: ActivityKind,
    details: String,
) -> NewActivity {
    NewActivity {
        user_id: actor.map(|a| a.id),
        username: actor
            .map(|a| a.username.clone())
            .unwrap_or_else(|| "cli".to_string()),
        kind,
        details: Some(format!("{} (user: {})", details, target.username)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use captionly_db::models::profile::Plan;

    fn profile(username: &str, email: &str) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            is_admin: false,
            email_confirmed_at: None,
            plan: Plan::Free,
            generations_today: 0,
            last_generation_date: Utc::now().date_naive(),
            license_key: None,
            pro_expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn audit_entry_names_actor_and_target() {
        let admin = profile("root", "root@example.com");
        let target = profile("dara", "dara@example.com");
        let entry = audit_entry(
            Some(&admin),
            &target,
            ActivityKind::ProPlanGrantedAdmin,
            format!("By Admin: {}", admin.email),
        );
        assert_eq!(entry.user_id, Some(admin.id));
        assert_eq!(entry.username, "root");
        assert_eq!(
            entry.details.as_deref(),
            Some("By Admin: root@example.com (user: dara)")
        );
    }

    #[test]
    fn cli_actions_are_attributed_to_cli() {
        let target = profile("dara", "dara@example.com");
        let entry = audit_entry(None, &target, ActivityKind::UserCreatedAdmin, "Created".into());
        assert_eq!(entry.user_id, None);
        assert_eq!(entry.username, "cli");
    }
}
