// Admin Module
// Users, licenses and the activity log, mounted under the admin path

pub mod activity;
pub mod licenses;
pub mod users;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::state::AppState;

pub use activity::get_activity;
pub use licenses::{delete_license, generate_license, get_licenses, toggle_license};
pub use users::{confirm_email, create_user, get_users, reset_generations, toggle_pro};

/// Flash message shown at the top of an admin tab.
pub struct Notice {
    pub ok: bool,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

pub fn routes(admin_path: &str) -> Router<AppState> {
    let users_path = format!("{}/users", admin_path);
    Router::new()
        .route(
            "/",
            get(move || {
                let target = users_path.clone();
                async move { Redirect::to(&target) }
            }),
        )
        .route("/users", get(get_users).post(create_user))
        .route("/users/{id}/toggle-pro", post(toggle_pro))
        .route("/users/{id}/reset-generations", post(reset_generations))
        .route("/users/{id}/confirm-email", post(confirm_email))
        .route("/licenses", get(get_licenses).post(generate_license))
        .route("/licenses/{id}/toggle", post(toggle_license))
        .route("/licenses/{id}/delete", post(delete_license))
        .route("/activity", get(get_activity))
}
