use uuid::Uuid;

use crate::application::access::require_owned_job;
use crate::application::errors::AppResult;
use crate::application::ports::application_repository::{ApplicationRepository, ApplicationView};
use crate::application::ports::job_repository::JobRepository;
use crate::domain::accounts::user::SchoolProfile;

pub struct JobApplications<'a, J, A>
where
    J: JobRepository + ?Sized,
    A: ApplicationRepository + ?Sized,
{
    pub jobs: &'a J,
    pub applications: &'a A,
}

impl<'a, J, A> JobApplications<'a, J, A>
where
    J: JobRepository + ?Sized,
    A: ApplicationRepository + ?Sized,
{
    pub async fn execute(&self, school: &SchoolProfile, job_id: Uuid) -> AppResult<Vec<ApplicationView>> {
        require_owned_job(self.jobs, school, job_id).await?;
        let mut list = self.applications.list_for_job(job_id).await?;
        list.sort_by(|a, b| b.application.created_at.cmp(&a.application.created_at));
        Ok(list)
    }
}
