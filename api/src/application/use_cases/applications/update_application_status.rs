use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::application_repository::{
    ApplicationRepository, ApplicationView, StatusChange,
};
use crate::application::services::email::EmailTemplate;
use crate::application::services::notifications::Notifications;
use crate::domain::accounts::user::SchoolProfile;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::applications::application::{Application, ApplicationStatus};

#[derive(Debug, Clone, Default)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
    pub note: Option<String>,
    pub interview_date: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
}

/// Loads an application that must target one of `school`'s jobs.
pub async fn owned_application<A>(
    applications: &A,
    school: &SchoolProfile,
    id: Uuid,
    denied: &str,
) -> AppResult<ApplicationView>
where
    A: ApplicationRepository + ?Sized,
{
    let view = applications
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("Application not found"))?;
    if view.school_id != school.id {
        return Err(AppError::forbidden(denied));
    }
    Ok(view)
}

pub struct UpdateApplicationStatus<'a, A>
where
    A: ApplicationRepository + ?Sized,
{
    pub applications: &'a A,
    pub notifications: &'a Notifications,
}

impl<'a, A> UpdateApplicationStatus<'a, A>
where
    A: ApplicationRepository + ?Sized,
{
    pub async fn execute(
        &self,
        school: &SchoolProfile,
        id: Uuid,
        req: StatusUpdateRequest,
        meta: &RequestMeta,
    ) -> AppResult<Application> {
        let view = owned_application(
            self.applications,
            school,
            id,
            "You can only update applications for your own jobs",
        )
        .await?;
        let previous = view.application.status;
        let status = match req.status.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => {
                ApplicationStatus::parse(raw).ok_or_else(|| AppError::validation("Invalid status"))?
            }
            None => previous,
        };
        if let Some(rating) = req.rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::validation("Rating must be between 1 and 5"));
            }
        }
        let note = req
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let updated = self
            .applications
            .update_status(
                id,
                &StatusChange {
                    status,
                    interview_date: req.interview_date,
                    rating: req.rating,
                    note: note.clone().map(|n| (school.author_name(), n)),
                },
            )
            .await?;

        self.notifications
            .record(
                ActivityEntry::new(
                    Some(school.user_id),
                    ActivityAction::ApplicationStatusUpdated,
                    json!({
                        "applicationId": id,
                        "previousStatus": previous.as_str(),
                        "newStatus": status.as_str(),
                        "applicantName": view.applicant_name,
                        "jobTitle": view.job_title,
                        "note": note,
                    }),
                )
                .with_meta(meta),
            )
            .await;

        if status != previous && !view.applicant_email.is_empty() {
            self.notifications
                .email(
                    &view.applicant_email,
                    EmailTemplate::ApplicationStatusUpdate {
                        teacher_name: view.applicant_name.clone(),
                        job_title: view.job_title.clone(),
                        school_name: school.name.clone(),
                        status,
                        note,
                    },
                    None,
                )
                .await;
        }
        Ok(updated)
    }
}
