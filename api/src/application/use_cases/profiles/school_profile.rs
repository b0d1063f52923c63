use serde_json::json;
use tracing::info;

use crate::application::access::{Actor, require_school};
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::profile_repository::ProfileRepository;
use crate::application::services::notifications::Notifications;
use crate::domain::accounts::user::{SchoolProfile, SchoolProfileEdit};
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};

const SCHOOLS_ONLY: &str = "School access required";

pub struct GetSchoolProfile<'a, P: ProfileRepository + ?Sized> {
    pub profiles: &'a P,
}

impl<'a, P: ProfileRepository + ?Sized> GetSchoolProfile<'a, P> {
    pub async fn execute(&self, actor: &Actor) -> AppResult<SchoolProfile> {
        require_school(self.profiles, actor, SCHOOLS_ONLY).await
    }
}

pub struct UpdateSchoolProfile<'a, P: ProfileRepository + ?Sized> {
    pub profiles: &'a P,
    pub notifications: &'a Notifications,
}

impl<'a, P: ProfileRepository + ?Sized> UpdateSchoolProfile<'a, P> {
    pub async fn execute(
        &self,
        actor: &Actor,
        edit: &SchoolProfileEdit,
        meta: &RequestMeta,
    ) -> AppResult<SchoolProfile> {
        let mut school = require_school(self.profiles, actor, SCHOOLS_ONLY).await?;
        if edit.missing_required() {
            return Err(AppError::validation_with(
                "Missing required fields",
                json!({ "required": ["name", "contactName", "city", "country"] }),
            ));
        }
        school.apply(edit);
        let saved = self.profiles.save_school(&school).await?;
        let completion = saved.completion_percentage();
        info!(school_id = %saved.id, completion, "school_profile_updated");
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(actor.user_id),
                    ActivityAction::ProfileUpdated,
                    json!({ "completionPercentage": completion }),
                )
                .with_meta(meta),
            )
            .await;
        Ok(saved)
    }
}
