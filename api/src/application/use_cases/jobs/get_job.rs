use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::job_repository::{JobListing, JobRepository};
use crate::application::ports::profile_repository::ProfileRepository;
use crate::domain::accounts::user::UserType;
use crate::domain::jobs::job::JobStatus;

pub struct GetJob<'a, J, P>
where
    J: JobRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    pub jobs: &'a J,
    pub profiles: &'a P,
}

impl<'a, J, P> GetJob<'a, J, P>
where
    J: JobRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    /// Non-active jobs are only visible to the school that owns them.
    pub async fn execute(&self, actor: &Actor, id: Uuid) -> AppResult<JobListing> {
        let job = self
            .jobs
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Job not found"))?;
        let school = self.profiles.school_by_id(job.school_id).await?;
        let owns = actor.user_type == UserType::School
            && school.as_ref().map(|s| s.user_id) == Some(actor.user_id);
        if job.status != JobStatus::Active && !owns {
            return Err(AppError::not_found("Job not found"));
        }
        let application_count = if owns {
            self.jobs.count_applications(job.id).await?
        } else {
            0
        };
        Ok(JobListing {
            job,
            school_name: school.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
            school_logo_url: school.and_then(|s| s.logo_url),
            application_count,
        })
    }
}
