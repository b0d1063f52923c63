use serde_json::json;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::job_repository::JobRepository;
use crate::application::services::notifications::Notifications;
use crate::domain::accounts::user::SchoolProfile;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::jobs::job::{Job, JobStatus, NewJob};

pub struct CreateJob<'a, J: JobRepository + ?Sized> {
    pub jobs: &'a J,
    pub notifications: &'a Notifications,
}

impl<'a, J: JobRepository + ?Sized> CreateJob<'a, J> {
    pub async fn execute(
        &self,
        school: &SchoolProfile,
        new: NewJob,
        meta: &RequestMeta,
    ) -> AppResult<Job> {
        if let Some(status) = new.status {
            if status == JobStatus::Closed {
                return Err(AppError::validation("A new job cannot start CLOSED"));
            }
        }
        school
            .subscription
            .status
            .posting_gate(new.is_draft())
            .map_err(|denied| AppError::forbidden(denied.message()))?;

        if !new.is_draft() {
            let missing = school.missing_posting_fields();
            if !missing.is_empty() {
                return Err(AppError::validation_with(
                    "Complete your school profile before posting jobs",
                    json!({ "missingFields": missing }),
                ));
            }
        }
        let missing = new.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::validation_with(
                "Missing required fields",
                json!({ "missingFields": missing }),
            ));
        }

        let job = self.jobs.create(school.id, &new).await?;
        tracing::info!(job_id = %job.id, school_id = %school.id, status = job.status.as_str(), "job_created");
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(school.user_id),
                    ActivityAction::JobCreated,
                    json!({ "jobId": job.id, "title": job.title, "status": job.status.as_str() }),
                )
                .with_meta(meta),
            )
            .await;
        Ok(job)
    }
}
