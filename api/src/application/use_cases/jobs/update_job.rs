use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::job_repository::JobRepository;
use crate::application::services::notifications::Notifications;
use crate::domain::accounts::user::SchoolProfile;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::jobs::job::{Job, JobChanges, JobStatus};

/// Partial edit of a posting. Publishing through an edit passes the same
/// gates as creating an active job; closing here sends no applicant emails.
pub struct UpdateJob<'a, J: JobRepository + ?Sized> {
    pub jobs: &'a J,
    pub notifications: &'a Notifications,
}

impl<'a, J: JobRepository + ?Sized> UpdateJob<'a, J> {
    pub async fn execute(
        &self,
        school: &SchoolProfile,
        id: Uuid,
        changes: &JobChanges,
        meta: &RequestMeta,
    ) -> AppResult<Job> {
        let mut job = self
            .jobs
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Job not found"))?;
        if job.school_id != school.id {
            return Err(AppError::forbidden("You can only update your own job postings"));
        }

        if changes.status == Some(JobStatus::Active) && job.status != JobStatus::Active {
            school
                .subscription
                .status
                .posting_gate(false)
                .map_err(|denied| AppError::forbidden(denied.message()))?;
            let missing = school.missing_posting_fields();
            if !missing.is_empty() {
                return Err(AppError::validation_with(
                    "Complete your school profile before posting jobs",
                    json!({ "missingFields": missing }),
                ));
            }
        }

        let changed = job.apply(changes).map_err(AppError::validation)?;
        let job = self.jobs.update(&job).await?;
        info!(job_id = %id, fields = changed.len(), "job_updated");
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(school.user_id),
                    ActivityAction::JobUpdated,
                    json!({ "jobId": id, "title": job.title, "changes": changed }),
                )
                .with_meta(meta),
            )
            .await;
        Ok(job)
    }
}
