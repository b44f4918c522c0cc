use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use captionly_db::models::activity::ActivityLogEntry;

use super::Notice;
use crate::handlers::auth::AdminUser;
use crate::state::AppState;
use crate::utils::format_datetime;

pub const ACTIVITY_PAGE_SIZE: i64 = 50;

#[derive(Template, WebTemplate)]
#[template(path = "admin_activity.html")]
pub struct ActivityTemplate {
    pub entries: Vec<ActivityRow>,
    pub logging_enabled: bool,
    pub notice: Option<Notice>,
    pub username: String,
    pub admin_path: String,
    pub active_page: String,
}

pub struct ActivityRow {
    pub created: String,
    pub username: String,
    pub label: String,
    pub details: String,
}

impl From<&ActivityLogEntry> for ActivityRow {
    fn from(entry: &ActivityLogEntry) -> Self {
        Self {
            created: format_datetime(&entry.created_at),
            username: entry.username.clone().unwrap_or_else(|| "-".to_string()),
            label: entry.label(),
            details: entry.details.clone().unwrap_or_default(),
        }
    }
}

/// GET {admin}/activity
pub async fn get_activity(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> impl IntoResponse {
    let (entries, notice) = match state.activity.latest(ACTIVITY_PAGE_SIZE).await {
        Ok(list) => (list.iter().map(ActivityRow::from).collect(), None),
        Err(e) => {
            tracing::error!("Failed to load activity log: {:#}", e);
            (Vec::new(), Some(Notice::error("Failed to load the activity log.")))
        }
    };

    ActivityTemplate {
        entries,
        logging_enabled: state.activity.is_enabled(),
        notice,
        username: admin.username,
        admin_path: state.admin_path.clone(),
        active_page: "activity".to_string(),
    }
}
