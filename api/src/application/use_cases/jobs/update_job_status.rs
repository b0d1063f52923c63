use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::application::access::require_owned_job;
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::application_repository::ApplicationRepository;
use crate::application::ports::job_repository::JobRepository;
use crate::application::services::email::EmailTemplate;
use crate::application::services::notifications::Notifications;
use crate::domain::accounts::user::SchoolProfile;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::jobs::job::{Job, JobStatus};

pub struct UpdateJobStatus<'a, J, A>
where
    J: JobRepository + ?Sized,
    A: ApplicationRepository + ?Sized,
{
    pub jobs: &'a J,
    pub applications: &'a A,
    pub notifications: &'a Notifications,
}

impl<'a, J, A> UpdateJobStatus<'a, J, A>
where
    J: JobRepository + ?Sized,
    A: ApplicationRepository + ?Sized,
{
    /// Closing a job tells every applicant still in the pipeline.
    pub async fn execute(
        &self,
        school: &SchoolProfile,
        id: Uuid,
        status: &str,
        meta: &RequestMeta,
    ) -> AppResult<Job> {
        let status = JobStatus::parse(status)
            .filter(JobStatus::is_settable)
            .ok_or_else(|| {
                AppError::validation("Invalid status. Must be ACTIVE, PAUSED, or CLOSED")
            })?;
        let existing = require_owned_job(self.jobs, school, id).await?;
        let job = self.jobs.set_status(id, status).await?;
        info!(job_id = %id, from = existing.status.as_str(), to = status.as_str(), "job_status_updated");

        self.notifications
            .record(
                ActivityEntry::new(
                    Some(school.user_id),
                    ActivityAction::JobStatusUpdated,
                    json!({
                        "jobId": id,
                        "jobTitle": job.title,
                        "previousStatus": existing.status.as_str(),
                        "newStatus": status.as_str(),
                    }),
                )
                .with_meta(meta),
            )
            .await;

        if status == JobStatus::Closed && existing.status != JobStatus::Closed {
            let pending = match self.applications.pending_applicants(id).await {
                Ok(list) => list,
                Err(e) => {
                    tracing::warn!(error = ?e, job_id = %id, "pending_applicants_lookup_failed");
                    Vec::new()
                }
            };
            for applicant in pending {
                self.notifications
                    .email(
                        &applicant.email,
                        EmailTemplate::JobClosed {
                            applicant_name: applicant.name.clone(),
                            job_title: job.title.clone(),
                            school_name: school.name.clone(),
                            location: job.location(),
                        },
                        None,
                    )
                    .await;
            }
        }
        Ok(job)
    }
}
