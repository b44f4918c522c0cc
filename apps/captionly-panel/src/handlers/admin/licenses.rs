// Licenses Module
// Pro key issuance, revocation and deletion

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, Path, State},
    response::IntoResponse,
};
use captionly_db::models::license::{License, LicenseStatus};
use captionly_db::models::profile::Profile;
use chrono::Utc;
use serde::Deserialize;

use super::Notice;
use crate::handlers::auth::AdminUser;
use crate::services::license_service::DEFAULT_LICENSE_DAYS;
use crate::state::AppState;
use crate::utils::{format_date, format_datetime};

#[derive(Template, WebTemplate)]
#[template(path = "admin_licenses.html")]
pub struct LicensesTemplate {
    pub licenses: Vec<LicenseRow>,
    pub default_days: i64,
    pub notice: Option<Notice>,
    pub username: String,
    pub admin_path: String,
    pub active_page: String,
}

pub struct LicenseRow {
    pub id: i64,
    pub key: String,
    pub status: String,
    pub is_revoked: bool,
    pub expired: bool,
    pub expires: String,
    pub created: String,
}

impl LicenseRow {
    fn new(license: &License, now: chrono::DateTime<Utc>) -> Self {
        Self {
            id: license.id,
            key: license.key.clone(),
            status: license.status.as_str().to_string(),
            is_revoked: license.status == LicenseStatus::Revoked,
            expired: license.is_expired_at(now),
            expires: format_date(&license.expires_at),
            created: format_datetime(&license.created_at),
        }
    }
}

#[derive(Deserialize)]
pub struct GenerateLicenseForm {
    /// Raw text so a blank or non-numeric field gets a readable error.
    #[serde(default)]
    pub days: String,
}

pub fn parse_days(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(DEFAULT_LICENSE_DAYS);
    }
    raw.parse().ok()
}

async fn render(state: &AppState, admin: &Profile, notice: Option<Notice>) -> LicensesTemplate {
    let now = Utc::now();
    let (licenses, notice) = match state.licenses.list().await {
        Ok(list) => (list.iter().map(|l| LicenseRow::new(l, now)).collect(), notice),
        Err(e) => {
            tracing::error!("Failed to load licenses: {:#}", e);
            (Vec::new(), Some(Notice::error("Failed to load licenses.")))
        }
    };

    LicensesTemplate {
        licenses,
        default_days: DEFAULT_LICENSE_DAYS,
        notice,
        username: admin.username.clone(),
        admin_path: state.admin_path.clone(),
        active_page: "licenses".to_string(),
    }
}

/// GET {admin}/licenses
pub async fn get_licenses(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> impl IntoResponse {
    render(&state, &admin, None).await
}

/// POST {admin}/licenses
pub async fn generate_license(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Form(form): Form<GenerateLicenseForm>,
) -> impl IntoResponse {
    let notice = match parse_days(&form.days) {
        None => Notice::error("Duration must be a whole number of days."),
        Some(days) => match state.licenses.generate(&admin, days).await {
            Ok(license) => Notice::success(format!(
                "Generated {} (expires {}).",
                license.key,
                format_date(&license.expires_at)
            )),
            Err(e) => {
                e.log();
                Notice::error(e.user_message())
            }
        },
    };
    render(&state, &admin, Some(notice)).await
}

/// POST {admin}/licenses/{id}/toggle
pub async fn toggle_license(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let notice = match state.licenses.toggle(&admin, id).await {
        Ok(license) => Notice::success(format!("License is now {}.", license.status)),
        Err(e) => {
            e.log();
            Notice::error(e.user_message())
        }
    };
    render(&state, &admin, Some(notice)).await
}

/// POST {admin}/licenses/{id}/delete
pub async fn delete_license(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let notice = match state.licenses.delete(&admin, id).await {
        Ok(()) => Notice::success("License deleted."),
        Err(e) => {
            e.log();
            Notice::error(e.user_message())
        }
    };
    render(&state, &admin, Some(notice)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_duration_uses_default() {
        assert_eq!(parse_days(""), Some(DEFAULT_LICENSE_DAYS));
        assert_eq!(parse_days(" 7 "), Some(7));
        assert_eq!(parse_days("seven"), None);
        // range is checked by the service
        assert_eq!(parse_days("0"), Some(0));
    }
}
