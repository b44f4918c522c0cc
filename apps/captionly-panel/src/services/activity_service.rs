use anyhow::Result;
use captionly_db::models::activity::{ActivityKind, ActivityLogEntry, NewActivity};
use captionly_db::models::profile::Profile;
use captionly_db::repositories::activity_repo::ActivityRepository;
use captionly_db::utils::is_undefined_table;
use sqlx::PgPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

/// Best-effort audit writer. Failures are logged and swallowed; a missing
/// `activity_log` table switches logging off for the rest of the process.
#[derive(Clone)]
pub struct ActivityLogger {
    repo: ActivityRepository,
    enabled: Arc<AtomicBool>,
}

impl ActivityLogger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: ActivityRepository::new(pool),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn entry(profile: &Profile, kind: ActivityKind, details: Option<String>) -> NewActivity {
        NewActivity {
            user_id: Some(profile.id),
            username: profile.username.clone(),
            kind,
            details,
        }
    }

    pub async fn write(&self, entry: NewActivity) {
        if !self.is_enabled() {
            return;
        }

        if let Err(e) = self.repo.insert(&entry).await {
            error!("Error logging activity ({}): {}", entry.kind.as_str(), e);
            if is_undefined_table(&e) {
                warn!("Disabling activity logging because the 'activity_log' table is missing.");
                self.enabled.store(false, Ordering::Relaxed);
            }
        }
    }

    /// Fire-and-forget variant used on request paths.
    pub fn record(&self, entry: NewActivity) {
        let logger = self.clone();
        tokio::spawn(async move {
            logger.write(entry).await;
        });
    }

    pub async fn latest(&self, limit: i64) -> Result<Vec<ActivityLogEntry>> {
        self.repo.get_latest(limit).await
    }
}

/// Redacts a license key down to its first eight characters for audit text.
pub fn key_hint(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("Key: {}...", prefix)
}
