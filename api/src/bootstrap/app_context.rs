use std::sync::Arc;

use crate::application::ports::activity_log::ActivityLog;
use crate::application::ports::application_repository::ApplicationRepository;
use crate::application::ports::blob_storage::BlobStorage;
use crate::application::ports::job_repository::JobRepository;
use crate::application::ports::mailer::Mailer;
use crate::application::ports::messaging_repository::MessagingRepository;
use crate::application::ports::profile_repository::ProfileRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications::Notifications;
use crate::bootstrap::config::Config;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

pub struct AppServices {
    user_repo: Arc<dyn UserRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    job_repo: Arc<dyn JobRepository>,
    application_repo: Arc<dyn ApplicationRepository>,
    messaging_repo: Arc<dyn MessagingRepository>,
    blob_storage: Arc<dyn BlobStorage>,
    notifications: Notifications,
}

impl AppServices {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: &Config,
        user_repo: Arc<dyn UserRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        job_repo: Arc<dyn JobRepository>,
        application_repo: Arc<dyn ApplicationRepository>,
        messaging_repo: Arc<dyn MessagingRepository>,
        blob_storage: Arc<dyn BlobStorage>,
        mailer: Arc<dyn Mailer>,
        activity_log: Arc<dyn ActivityLog>,
    ) -> Self {
        let site_url = cfg
            .frontend_url
            .clone()
            .unwrap_or_else(|| "http://localhost:5173".to_string());
        Self {
            user_repo,
            profile_repo,
            job_repo,
            application_repo,
            messaging_repo,
            blob_storage,
            notifications: Notifications::new(mailer, activity_log, site_url),
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn user_repo(&self) -> Arc<dyn UserRepository> {
        self.services.user_repo.clone()
    }

    pub fn profile_repo(&self) -> Arc<dyn ProfileRepository> {
        self.services.profile_repo.clone()
    }

    pub fn job_repo(&self) -> Arc<dyn JobRepository> {
        self.services.job_repo.clone()
    }

    pub fn application_repo(&self) -> Arc<dyn ApplicationRepository> {
        self.services.application_repo.clone()
    }

    pub fn messaging_repo(&self) -> Arc<dyn MessagingRepository> {
        self.services.messaging_repo.clone()
    }

    pub fn blob_storage(&self) -> Arc<dyn BlobStorage> {
        self.services.blob_storage.clone()
    }

    pub fn notifications(&self) -> &Notifications {
        &self.services.notifications
    }

    pub fn upload_limit(&self) -> u64 {
        self.cfg.upload_max_bytes as u64
    }
}

#[cfg(test)]
impl AppContext {
    /// Context over the in-memory fakes, sharing state with `fx`.
    pub fn from_fixture(fx: &crate::application::test_support::Fixture) -> Self {
        let cfg = Config::for_tests();
        let services = AppServices {
            user_repo: fx.users.clone(),
            profile_repo: fx.profiles.clone(),
            job_repo: fx.jobs.clone(),
            application_repo: fx.applications.clone(),
            messaging_repo: fx.messaging.clone(),
            blob_storage: fx.blobs.clone(),
            notifications: fx.notifications.clone(),
        };
        Self::new(cfg, services)
    }
}
