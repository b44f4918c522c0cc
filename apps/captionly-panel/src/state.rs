use std::sync::Arc;

use captionly_db::repositories::license_repo::LicenseRepository;
use captionly_db::repositories::profile_repo::ProfileRepository;
use sqlx::PgPool;

use crate::config::PanelConfig;
use crate::services::activity_service::ActivityLogger;
use crate::services::auth_service::AuthService;
use crate::services::caption_service::CaptionService;
use crate::services::entitlement_service::EntitlementService;
use crate::services::generation_service::CaptionModel;
use crate::services::license_service::LicenseService;
use crate::services::user_service::UserService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub admin_path: String,
    pub auth: AuthService,
    pub entitlements: EntitlementService,
    pub captions: CaptionService,
    pub users: UserService,
    pub licenses: LicenseService,
    pub activity: ActivityLogger,
}

impl AppState {
    pub fn new(pool: PgPool, config: &PanelConfig, model: Arc<dyn CaptionModel>) -> Self {
        let activity = ActivityLogger::new(pool.clone());
        let profiles = ProfileRepository::new(pool.clone());
        let entitlements = EntitlementService::new(pool.clone(), activity.clone());

        Self {
            admin_path: config.admin_path.clone(),
            auth: AuthService::new(
                profiles.clone(),
                activity.clone(),
                config.session_secret.clone(),
            ),
            captions: CaptionService::new(model, entitlements.clone()),
            users: UserService::new(profiles, entitlements.clone(), activity.clone()),
            licenses: LicenseService::new(LicenseRepository::new(pool.clone()), activity.clone()),
            entitlements,
            activity,
            pool,
        }
    }
}
