use std::sync::Arc;

use captionly_db::models::profile::Profile;
use captionly_shared::caption::{CaptionRequest, GenerationResult};
use tracing::{info, warn};

use crate::entitlement::Quota;
use crate::error::AppError;
use crate::prompt;
use crate::services::entitlement_service::EntitlementService;
use crate::services::generation_service::CaptionModel;

/// One generation: validate, take a quota slot, call the model. A failed
/// model call hands the slot back.
#[derive(Clone)]
pub struct CaptionService {
    model: Arc<dyn CaptionModel>,
    entitlements: EntitlementService,
}

impl CaptionService {
    pub fn new(model: Arc<dyn CaptionModel>, entitlements: EntitlementService) -> Self {
        Self {
            model,
            entitlements,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// `profile` must already be reconciled. On return it reflects the
    /// stored counter.
    pub async fn generate(
        &self,
        profile: &mut Profile,
        request: &CaptionRequest,
    ) -> Result<(GenerationResult, Quota), AppError> {
        let request = prompt::validate(request)?;

        if !self.entitlements.quota(profile).can_generate {
            info!("Quota exhausted for {}", profile.username);
            return Err(AppError::QuotaExceeded);
        }
        let reserved_on = self.entitlements.reserve_generation(profile).await?;

        let spec = prompt::build_prompt(&request);
        let result = match self.model.generate(&spec).await {
            Ok(result) => result,
            Err(e) => {
                if let Err(release) = self.entitlements.release_generation(profile, reserved_on).await {
                    warn!("Slot for {} not released: {:#}", profile.username, release);
                }
                return Err(e.into());
            }
        };

        self.entitlements.log_generation(profile);
        Ok((result, self.entitlements.quota(profile)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::FREE_DAILY_LIMIT;
    use crate::prompt::PromptSpec;
    use crate::services::activity_service::ActivityLogger;
    use crate::services::generation_service::GenerationError;
    use async_trait::async_trait;
    use captionly_db::models::profile::Plan;
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Default)]
    struct CountingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CaptionModel for CountingModel {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(&self, spec: &PromptSpec) -> Result<GenerationResult, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GenerationResult {
                caption: format!("caption for {} chars", spec.prompt.len()),
                hashtags: vec!["#test".to_string()],
            })
        }
    }

    fn service(model: Arc<CountingModel>) -> CaptionService {
        // unreachable store, fails fast
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let entitlements = EntitlementService::new(pool.clone(), ActivityLogger::new(pool));
        CaptionService::new(model, entitlements)
    }

    fn profile(used: i32) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            username: "dara".to_string(),
            email: "dara@example.com".to_string(),
            password_hash: String::new(),
            is_admin: false,
            email_confirmed_at: Some(Utc::now()),
            plan: Plan::Free,
            generations_today: used,
            last_generation_date: Utc::now().date_naive(),
            license_key: None,
            pro_expires_at: None,
            created_at: Utc::now(),
        }
    }

    fn request(product: &str) -> CaptionRequest {
        CaptionRequest {
            product_name: product.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn exhausted_quota_never_reaches_the_model() {
        let model = Arc::new(CountingModel::default());
        let captions = service(model.clone());
        let mut user = profile(FREE_DAILY_LIMIT);

        let err = captions.generate(&mut user, &request("soap")).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_product_is_a_validation_error() {
        let model = Arc::new(CountingModel::default());
        let captions = service(model.clone());
        let mut user = profile(0);

        let err = captions.generate(&mut user, &request("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_store_blocks_generation() {
        let model = Arc::new(CountingModel::default());
        let captions = service(model.clone());
        let mut user = profile(1);

        let err = captions.generate(&mut user, &request("soap")).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(user.generations_today, 1);
    }
}
