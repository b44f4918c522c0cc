use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use captionly_shared::api::MessageResponse;
use tracing::error;

use crate::entitlement::LicenseError;
use crate::prompt::ValidationError;
use crate::services::auth_service::AuthError;
use crate::services::generation_service::GenerationError;

/// Khmer "there was a problem generating the caption, please try again".
pub const GENERATION_FAILED_MESSAGE: &str = "មានបញ្ហាក្នុងការបង្កើតចំណងជើង។ សូម​ព្យាយាម​ម្តង​ទៀត។";
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "You have used all of today's generations. Upgrade to Pro or come back tomorrow.";
pub const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("daily quota exceeded")]
    QuotaExceeded,
    #[error(transparent)]
    License(#[from] LicenseError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.0)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::License(_) => StatusCode::BAD_REQUEST,
            AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show an end user. Upstream and store details stay in
    /// the server log.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Auth(e) => e.to_string(),
            AppError::QuotaExceeded => QUOTA_EXCEEDED_MESSAGE.to_string(),
            AppError::License(e) => e.to_string(),
            AppError::Generation(_) => GENERATION_FAILED_MESSAGE.to_string(),
            AppError::Internal(_) => INTERNAL_MESSAGE.to_string(),
        }
    }

    /// Logs upstream/store failures with their detail.
    pub fn log(&self) {
        match self {
            AppError::Generation(e) => error!("Caption generation failed: {}", e),
            AppError::Internal(e) => error!("Request failed: {:#}", e),
            _ => {}
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let body = MessageResponse {
            ok: false,
            message: self.user_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
