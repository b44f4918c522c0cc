use axum::{
    Router,
    routing::{get, post},
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::handlers::{admin, auth, frontend, health};
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    let admin_path = state.admin_path.clone();

    Router::new()
        .route("/health", get(health::health_check))
        .route("/", get(frontend::landing))
        .route("/login", get(auth::get_login).post(auth::login))
        .route("/logout", get(auth::logout))
        .route(
            "/generator",
            get(frontend::get_generator).post(frontend::post_generator),
        )
        .route("/pro/redeem", post(frontend::redeem))
        .nest("/api/client", api::client::routes())
        .nest(&admin_path, admin::routes(&admin_path))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
