use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use captionly_db::models::profile::Profile;
use captionly_shared::api::{
    GenerateResponse, LoginRequest, LoginResponse, MessageResponse, OptionsResponse, ProfileView,
    QuotaView, RedeemLicenseRequest,
};
use captionly_shared::caption::{Audience, CaptionRequest, EXAMPLE_PRODUCTS, Length, Platform, Style};

use crate::entitlement::Quota;
use crate::error::AppError;
use crate::handlers::auth::SessionUser;
use crate::services::entitlement_service::REDEEM_SUCCESS_MESSAGE;
use crate::state::AppState;
use crate::utils::option_entries;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/me", get(me))
        .route("/options", get(options))
        .route("/generate", post(generate))
        .route("/license/redeem", post(redeem_license))
}

fn quota_view(quota: Quota) -> QuotaView {
    QuotaView {
        limit: quota.limit,
        remaining: quota.remaining,
        can_generate: quota.can_generate,
    }
}

pub fn profile_view(profile: &Profile, quota: Quota) -> ProfileView {
    ProfileView {
        id: profile.id.to_string(),
        username: profile.username.clone(),
        email: profile.email.clone(),
        plan: profile.plan.as_str().to_string(),
        is_admin: profile.is_admin,
        generations_today: profile.generations_today,
        last_generation_date: profile.last_generation_date.to_string(),
        license_key: profile.license_key.clone(),
        pro_expires_at: profile.pro_expires_at.map(|t| t.timestamp_millis()),
        quota: quota_view(quota),
    }
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (token, profile) = state.auth.login(&payload.email, &payload.password).await?;
    // reconcile before reporting quota
    let profile = state.entitlements.load(profile.id).await?.unwrap_or(profile);
    let quota = state.entitlements.quota(&profile);

    Ok(Json(LoginResponse {
        token,
        profile: profile_view(&profile, quota),
    }))
}

async fn me(
    State(state): State<AppState>,
    SessionUser(profile): SessionUser,
) -> Json<ProfileView> {
    let quota = state.entitlements.quota(&profile);
    Json(profile_view(&profile, quota))
}

async fn options() -> Json<OptionsResponse> {
    Json(OptionsResponse {
        platforms: option_entries(&Platform::ALL, |p| p.as_str(), |p| p.label()),
        styles: option_entries(&Style::ALL, |s| s.as_str(), |s| s.label()),
        audiences: option_entries(&Audience::ALL, |a| a.as_str(), |a| a.label()),
        lengths: option_entries(&Length::ALL, |l| l.as_str(), |l| l.label()),
        example_products: EXAMPLE_PRODUCTS.iter().map(|p| p.to_string()).collect(),
    })
}

async fn generate(
    State(state): State<AppState>,
    SessionUser(mut profile): SessionUser,
    Json(request): Json<CaptionRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let (result, quota) = state.captions.generate(&mut profile, &request).await?;
    Ok(Json(GenerateResponse {
        result,
        quota: quota_view(quota),
    }))
}

async fn redeem_license(
    State(state): State<AppState>,
    SessionUser(mut profile): SessionUser,
    Json(payload): Json<RedeemLicenseRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .entitlements
        .redeem_license(&mut profile, &payload.key)
        .await?;
    Ok(Json(MessageResponse {
        ok: true,
        message: REDEEM_SUCCESS_MESSAGE.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use captionly_db::models::profile::Plan;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn profile_view_reports_expiry_in_millis() {
        let expiry = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let profile = Profile {
            id: Uuid::new_v4(),
            username: "dara".to_string(),
            email: "dara@example.com".to_string(),
            password_hash: "secret".to_string(),
            is_admin: false,
            email_confirmed_at: None,
            plan: Plan::Pro,
            generations_today: 4,
            last_generation_date: Utc::now().date_naive(),
            license_key: Some("PRO-ABC".to_string()),
            pro_expires_at: Some(expiry),
            created_at: Utc::now(),
        };
        let view = profile_view(
            &profile,
            Quota {
                limit: 10,
                remaining: 6,
                can_generate: true,
            },
        );
        assert_eq!(view.plan, "pro");
        assert_eq!(view.pro_expires_at, Some(expiry.timestamp_millis()));
        assert_eq!(view.quota.remaining, 6);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
