use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;
use crate::utils::panel_version;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!("Health check: database unreachable: {}", e);
            "unreachable"
        }
    };

    Json(json!({
        "status": if database == "ok" { "ok" } else { "degraded" },
        "database": database,
        "model": state.captions.model_name(),
        "activity_log": state.activity.is_enabled(),
        "version": panel_version(),
    }))
}
