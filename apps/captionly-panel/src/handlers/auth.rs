// Authentication Module
// Session extractors, login and logout

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, FromRequestParts, State},
    http::{StatusCode, header, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use captionly_db::models::profile::Profile;
use serde::Deserialize;
use time::Duration;

use crate::error::AppError;
use crate::services::auth_service::{AuthError, SESSION_TTL_DAYS};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";

// ============================================================================
// Extractors
// ============================================================================

/// Signed-in profile for the JSON API. Rejects with a 401 JSON body.
pub struct SessionUser(pub Profile);

/// Signed-in profile for HTML views. Redirects to `/login` otherwise.
pub struct ViewUser(pub Profile);

/// Signed-in administrator for the admin console.
pub struct AdminUser(pub Profile);

/// Cookie first, then `Authorization: Bearer`.
fn session_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Profile, AppError> {
    let claims = session_token(parts)
        .and_then(|token| state.auth.verify_token(&token))
        .ok_or(AuthError::Unauthorized)?;
    let id = claims.profile_id().ok_or(AuthError::Unauthorized)?;

    // A deleted profile invalidates its outstanding tokens.
    state
        .entitlements
        .load(id)
        .await?
        .ok_or_else(|| AuthError::Unauthorized.into())
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await.map(SessionUser)
    }
}

impl FromRequestParts<AppState> for ViewUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await {
            Ok(profile) => Ok(ViewUser(profile)),
            Err(AppError::Auth(_)) => Err(Redirect::to("/login").into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ViewUser(profile) = ViewUser::from_request_parts(parts, state).await?;
        if !profile.is_admin {
            tracing::warn!("Non-admin {} tried to open the admin console", profile.username);
            return Err((
                StatusCode::FORBIDDEN,
                Html(AuthError::Forbidden.to_string()),
            )
                .into_response());
        }
        Ok(AdminUser(profile))
    }
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build()
}

fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_value("");
    cookie.set_path("/");
    cookie.set_max_age(Duration::seconds(0));
    cookie
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /login
pub async fn get_login() -> impl IntoResponse {
    LoginTemplate {
        email: String::new(),
        error: None,
    }
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth.login(&form.email, &form.password).await {
        Ok((token, _profile)) => {
            (jar.add(session_cookie(token)), Redirect::to("/generator")).into_response()
        }
        Err(e) => {
            e.log();
            let status = e.status();
            let page = LoginTemplate {
                email: form.email,
                error: Some(e.user_message()),
            };
            (status, page).into_response()
        }
    }
}

/// GET /logout
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.add(expired_session_cookie()), Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/client/me");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let p = parts(&[
            ("cookie", "session=from-cookie"),
            ("authorization", "Bearer from-header"),
        ]);
        assert_eq!(session_token(&p).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn bearer_is_used_without_cookie() {
        let p = parts(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(session_token(&p).as_deref(), Some("abc.def.ghi"));
        assert!(session_token(&parts(&[("authorization", "Basic xyz")])).is_none());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("t".to_string());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::days(SESSION_TTL_DAYS)));
    }
}
