use serde_json::json;
use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::application_repository::ApplicationRepository;
use crate::application::services::notifications::Notifications;
use crate::application::use_cases::applications::update_application_status::owned_application;
use crate::domain::accounts::user::SchoolProfile;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::applications::application::ApplicationNote;

const DENIED: &str = "You can only manage notes for applications to your own jobs";

pub struct ListNotes<'a, A: ApplicationRepository + ?Sized> {
    pub applications: &'a A,
}

impl<'a, A: ApplicationRepository + ?Sized> ListNotes<'a, A> {
    pub async fn execute(
        &self,
        school: &SchoolProfile,
        application_id: Uuid,
    ) -> AppResult<Vec<ApplicationNote>> {
        owned_application(self.applications, school, application_id, DENIED).await?;
        let mut notes = self.applications.list_notes(application_id).await?;
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }
}

pub struct AddNote<'a, A: ApplicationRepository + ?Sized> {
    pub applications: &'a A,
    pub notifications: &'a Notifications,
}

impl<'a, A: ApplicationRepository + ?Sized> AddNote<'a, A> {
    pub async fn execute(
        &self,
        school: &SchoolProfile,
        application_id: Uuid,
        content: &str,
        meta: &RequestMeta,
    ) -> AppResult<ApplicationNote> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::validation("Note content is required"));
        }
        owned_application(self.applications, school, application_id, DENIED).await?;
        let note = self
            .applications
            .add_note(application_id, &school.author_name(), content)
            .await?;
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(school.user_id),
                    ActivityAction::ApplicationNoteAdded,
                    json!({ "applicationId": application_id, "noteId": note.id }),
                )
                .with_meta(meta),
            )
            .await;
        Ok(note)
    }
}
