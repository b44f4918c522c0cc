// Users Module
// Profile list, creation and entitlement overrides

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, Path, State},
    response::IntoResponse,
};
use captionly_db::models::profile::Profile;
use serde::Deserialize;
use uuid::Uuid;

use super::Notice;
use crate::entitlement;
use crate::error::AppError;
use crate::handlers::auth::AdminUser;
use crate::services::user_service::CreateUser;
use crate::state::AppState;
use crate::utils::format_optional_date;

// ============================================================================
// Templates
// ============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "admin_users.html")]
pub struct UsersTemplate {
    pub users: Vec<UserRow>,
    pub notice: Option<Notice>,
    pub username: String,
    pub admin_path: String,
    pub active_page: String,
}

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub plan: String,
    pub is_pro: bool,
    pub is_admin: bool,
    pub email_confirmed: bool,
    pub generations_today: i32,
    pub daily_limit: i32,
    pub pro_expires: String,
    pub license_key: String,
}

impl From<&Profile> for UserRow {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id.to_string(),
            username: p.username.clone(),
            email: p.email.clone(),
            plan: p.plan.as_str().to_string(),
            is_pro: p.is_pro(),
            is_admin: p.is_admin,
            email_confirmed: p.is_email_confirmed(),
            generations_today: p.generations_today,
            daily_limit: entitlement::daily_limit(p.plan),
            pro_expires: format_optional_date(p.pro_expires_at.as_ref()),
            license_key: p.license_key.clone().unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateUserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Checkbox: present when ticked.
    pub require_confirmation: Option<String>,
    pub is_admin: Option<String>,
}

async fn render(state: &AppState, admin: &Profile, notice: Option<Notice>) -> UsersTemplate {
    let (users, notice) = match state.users.list().await {
        Ok(list) => (list.iter().map(UserRow::from).collect(), notice),
        Err(e) => {
            tracing::error!("Failed to load users: {:#}", e);
            (Vec::new(), Some(Notice::error("Failed to load users.")))
        }
    };

    UsersTemplate {
        users,
        notice,
        username: admin.username.clone(),
        admin_path: state.admin_path.clone(),
        active_page: "users".to_string(),
    }
}

fn outcome<T>(result: Result<T, AppError>, success: impl FnOnce(T) -> String) -> Notice {
    match result {
        Ok(value) => Notice::success(success(value)),
        Err(e) => {
            e.log();
            Notice::error(e.user_message())
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET {admin}/users
pub async fn get_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> impl IntoResponse {
    render(&state, &admin, None).await
}

/// POST {admin}/users
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Form(form): Form<CreateUserForm>,
) -> impl IntoResponse {
    let input = CreateUser {
        username: form.username,
        email: form.email,
        password: form.password,
        is_admin: form.is_admin.is_some(),
        require_confirmation: form.require_confirmation.is_some(),
    };
    let result = state.users.create_user(Some(&admin), input).await;
    let notice = outcome(result, |p| {
        if p.is_email_confirmed() {
            format!("User \"{}\" created and can sign in now.", p.username)
        } else {
            format!(
                "User \"{}\" created. They must confirm their email before signing in.",
                p.username
            )
        }
    });
    render(&state, &admin, Some(notice)).await
}

/// POST {admin}/users/{id}/toggle-pro
pub async fn toggle_pro(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let result = state.users.toggle_pro(&admin, id).await;
    let notice = outcome(result, |p| {
        if p.is_pro() {
            format!(
                "Pro plan granted to {} until {}.",
                p.username,
                format_optional_date(p.pro_expires_at.as_ref())
            )
        } else {
            format!("Pro plan revoked for {}.", p.username)
        }
    });
    render(&state, &admin, Some(notice)).await
}

/// POST {admin}/users/{id}/reset-generations
pub async fn reset_generations(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let result = state.users.reset_generations(&admin, id).await;
    let notice = outcome(result, |p| format!("Generations reset for {}.", p.username));
    render(&state, &admin, Some(notice)).await
}

/// POST {admin}/users/{id}/confirm-email
pub async fn confirm_email(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let result = state.users.confirm_email(&admin, id).await;
    let notice = outcome(result, |_| "Email confirmed.".to_string());
    render(&state, &admin, Some(notice)).await
}
