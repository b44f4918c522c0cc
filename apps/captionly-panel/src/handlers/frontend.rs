// Frontend Module
// Landing page, caption generator and Pro key redemption

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use captionly_db::models::profile::Profile;
use captionly_shared::api::OptionEntry;
use captionly_shared::caption::{
    Audience, CaptionRequest, EXAMPLE_PRODUCTS, GenerationResult, Length, Platform, Style,
};
use serde::Deserialize;

use super::auth::{SESSION_COOKIE, ViewUser};
use crate::entitlement::{FREE_DAILY_LIMIT, PRO_DAILY_LIMIT, Quota};
use crate::services::entitlement_service::REDEEM_SUCCESS_MESSAGE;
use crate::state::AppState;
use crate::utils::{format_optional_date, option_entries};

// ============================================================================
// Templates
// ============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "landing.html")]
pub struct LandingTemplate {
    pub free_limit: i32,
    pub pro_limit: i32,
}

#[derive(Template, WebTemplate)]
#[template(path = "generator.html")]
pub struct GeneratorTemplate {
    pub username: String,
    pub is_admin: bool,
    pub admin_path: String,
    pub is_pro: bool,
    pub pro_expires: String,
    pub quota: Quota,
    pub platforms: Vec<OptionEntry>,
    pub styles: Vec<OptionEntry>,
    pub audiences: Vec<OptionEntry>,
    pub lengths: Vec<OptionEntry>,
    pub example_products: Vec<String>,
    pub form: GeneratorFormView,
    pub result: Option<GenerationResult>,
    pub error: Option<String>,
    pub redeem_notice: Option<Notice>,
}

/// Current form values, echoed back after a submit.
pub struct GeneratorFormView {
    pub product_name: String,
    pub platform: String,
    pub style: String,
    pub audience: String,
    pub length: String,
    pub generate_hashtags: bool,
}

impl From<&CaptionRequest> for GeneratorFormView {
    fn from(req: &CaptionRequest) -> Self {
        Self {
            product_name: req.product_name.clone(),
            platform: req.platform.as_str().to_string(),
            style: req.style.as_str().to_string(),
            audience: req.audience.as_str().to_string(),
            length: req.length.as_str().to_string(),
            generate_hashtags: req.generate_hashtags,
        }
    }
}

pub struct Notice {
    pub ok: bool,
    pub message: String,
}

#[derive(Deserialize)]
pub struct GeneratorForm {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub audience: Audience,
    #[serde(default)]
    pub length: Length,
    /// Checkbox: present ("on") when ticked.
    pub generate_hashtags: Option<String>,
}

impl From<GeneratorForm> for CaptionRequest {
    fn from(form: GeneratorForm) -> Self {
        CaptionRequest {
            platform: form.platform,
            product_name: form.product_name,
            style: form.style,
            audience: form.audience,
            length: form.length,
            generate_hashtags: form.generate_hashtags.is_some(),
        }
    }
}

#[derive(Deserialize)]
pub struct RedeemForm {
    #[serde(default)]
    pub key: String,
}

fn generator_page(state: &AppState, profile: &Profile, request: &CaptionRequest) -> GeneratorTemplate {
    GeneratorTemplate {
        username: profile.username.clone(),
        is_admin: profile.is_admin,
        admin_path: state.admin_path.clone(),
        is_pro: profile.is_pro(),
        pro_expires: format_optional_date(profile.pro_expires_at.as_ref()),
        quota: state.entitlements.quota(profile),
        platforms: option_entries(&Platform::ALL, |p| p.as_str(), |p| p.label()),
        styles: option_entries(&Style::ALL, |s| s.as_str(), |s| s.label()),
        audiences: option_entries(&Audience::ALL, |a| a.as_str(), |a| a.label()),
        lengths: option_entries(&Length::ALL, |l| l.as_str(), |l| l.label()),
        example_products: EXAMPLE_PRODUCTS.iter().map(|p| p.to_string()).collect(),
        form: GeneratorFormView::from(request),
        result: None,
        error: None,
        redeem_notice: None,
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /
pub async fn landing(jar: CookieJar) -> Response {
    if jar.get(SESSION_COOKIE).is_some_and(|c| !c.value().is_empty()) {
        return Redirect::to("/generator").into_response();
    }
    LandingTemplate {
        free_limit: FREE_DAILY_LIMIT,
        pro_limit: PRO_DAILY_LIMIT,
    }
    .into_response()
}

/// GET /generator
pub async fn get_generator(
    State(state): State<AppState>,
    ViewUser(profile): ViewUser,
) -> impl IntoResponse {
    generator_page(&state, &profile, &CaptionRequest::default())
}

/// POST /generator
pub async fn post_generator(
    State(state): State<AppState>,
    ViewUser(mut profile): ViewUser,
    Form(form): Form<GeneratorForm>,
) -> impl IntoResponse {
    let request = CaptionRequest::from(form);
    let outcome = state.captions.generate(&mut profile, &request).await;

    let mut page = generator_page(&state, &profile, &request);
    match outcome {
        Ok((result, _quota)) => page.result = Some(result),
        Err(e) => {
            e.log();
            page.error = Some(e.user_message());
        }
    }
    page
}

/// POST /pro/redeem
pub async fn redeem(
    State(state): State<AppState>,
    ViewUser(mut profile): ViewUser,
    Form(form): Form<RedeemForm>,
) -> impl IntoResponse {
    let notice = match state.entitlements.redeem_license(&mut profile, &form.key).await {
        Ok(()) => Notice {
            ok: true,
            message: REDEEM_SUCCESS_MESSAGE.to_string(),
        },
        Err(e) => {
            e.log();
            Notice {
                ok: false,
                message: e.user_message(),
            }
        }
    };

    let mut page = generator_page(&state, &profile, &CaptionRequest::default());
    page.redeem_notice = Some(notice);
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{Request, header};

    async fn parse(body: &'static str) -> CaptionRequest {
        let req = Request::builder()
            .method("POST")
            .uri("/generator")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let Form(form) = Form::<GeneratorForm>::from_request(req, &()).await.unwrap();
        CaptionRequest::from(form)
    }

    #[tokio::test]
    async fn unticked_hashtag_box_disables_hashtags() {
        let req = parse("product_name=soap&style=funny&length=long").await;
        assert_eq!(req.style, Style::Funny);
        assert_eq!(req.length, Length::Long);
        assert_eq!(req.audience, Audience::General);
        assert!(!req.generate_hashtags);

        let ticked = parse("product_name=soap&generate_hashtags=on").await;
        assert!(ticked.generate_hashtags);
    }

    #[tokio::test]
    async fn snake_case_audience_values_parse() {
        let req = parse("product_name=x&audience=young_adults").await;
        assert_eq!(req.audience, Audience::YoungAdults);
    }
}
