use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub activity_type: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn label(&self) -> String {
        ActivityKind::from_str_opt(&self.activity_type)
            .map(|k| k.label().to_string())
            .unwrap_or_else(|| self.activity_type.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    UserLogin,
    CaptionGeneration,
    ProPlanActivatedKey,
    ProPlanGrantedAdmin,
    ProPlanRevokedAdmin,
    UserCreatedAdmin,
    GenerationsResetAdmin,
    LicenseCreatedAdmin,
    LicenseStatusAdmin,
    LicenseDeletedAdmin,
    EmailConfirmedAdmin,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::UserLogin => "user_login",
            ActivityKind::CaptionGeneration => "caption_generation",
            ActivityKind::ProPlanActivatedKey => "pro_plan_activated_key",
            ActivityKind::ProPlanGrantedAdmin => "pro_plan_granted_admin",
            ActivityKind::ProPlanRevokedAdmin => "pro_plan_revoked_admin",
            ActivityKind::UserCreatedAdmin => "user_created_admin",
            ActivityKind::GenerationsResetAdmin => "generations_reset_admin",
            ActivityKind::LicenseCreatedAdmin => "license_created_admin",
            ActivityKind::LicenseStatusAdmin => "license_status_admin",
            ActivityKind::LicenseDeletedAdmin => "license_deleted_admin",
            ActivityKind::EmailConfirmedAdmin => "email_confirmed_admin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::UserLogin => "User Login",
            ActivityKind::CaptionGeneration => "Caption Generated",
            ActivityKind::ProPlanActivatedKey => "Pro Activated (Key)",
            ActivityKind::ProPlanGrantedAdmin => "Pro Plan Granted",
            ActivityKind::ProPlanRevokedAdmin => "Pro Plan Revoked",
            ActivityKind::UserCreatedAdmin => "User Created",
            ActivityKind::GenerationsResetAdmin => "Generations Reset",
            ActivityKind::LicenseCreatedAdmin => "License Created",
            ActivityKind::LicenseStatusAdmin => "License Status Changed",
            ActivityKind::LicenseDeletedAdmin => "License Deleted",
            ActivityKind::EmailConfirmedAdmin => "Email Confirmed",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        let kind = match s {
            "user_login" => ActivityKind::UserLogin,
            "caption_generation" => ActivityKind::CaptionGeneration,
            "pro_plan_activated_key" => ActivityKind::ProPlanActivatedKey,
            "pro_plan_granted_admin" => ActivityKind::ProPlanGrantedAdmin,
            "pro_plan_revoked_admin" => ActivityKind::ProPlanRevokedAdmin,
            "user_created_admin" => ActivityKind::UserCreatedAdmin,
            "generations_reset_admin" => ActivityKind::GenerationsResetAdmin,
            "license_created_admin" => ActivityKind::LicenseCreatedAdmin,
            "license_status_admin" => ActivityKind::LicenseStatusAdmin,
            "license_deleted_admin" => ActivityKind::LicenseDeletedAdmin,
            "email_confirmed_admin" => ActivityKind::EmailConfirmedAdmin,
            _ => return None,
        };
        Some(kind)
    }
}

/// Insert payload; `id` and `created_at` come from the table defaults.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Option<Uuid>,
    pub username: String,
    pub kind: ActivityKind,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_activity_type_falls_back_to_raw_text() {
        let entry = ActivityLogEntry {
            id: 1,
            user_id: None,
            username: None,
            activity_type: "legacy_event".to_string(),
            details: None,
            created_at: Utc::now(),
        };
        assert_eq!(entry.label(), "legacy_event");

        let known = ActivityLogEntry {
            activity_type: ActivityKind::ProPlanGrantedAdmin.as_str().to_string(),
            ..entry
        };
        assert_eq!(known.label(), "Pro Plan Granted");
    }
}
