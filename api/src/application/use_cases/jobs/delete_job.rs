use serde_json::json;
use uuid::Uuid;

use crate::application::access::require_owned_job;
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::job_repository::JobRepository;
use crate::application::services::notifications::Notifications;
use crate::domain::accounts::user::SchoolProfile;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::jobs::job::JobStatus;

pub struct DeleteJob<'a, J: JobRepository + ?Sized> {
    pub jobs: &'a J,
    pub notifications: &'a Notifications,
}

impl<'a, J: JobRepository + ?Sized> DeleteJob<'a, J> {
    pub async fn execute(&self, school: &SchoolProfile, id: Uuid, meta: &RequestMeta) -> AppResult<()> {
        let job = require_owned_job(self.jobs, school, id).await?;
        if job.status != JobStatus::Draft && self.jobs.count_applications(id).await? > 0 {
            return Err(AppError::validation(
                "Cannot delete job with applications. Close the job instead.",
            ));
        }
        if !self.jobs.delete(id).await? {
            return Err(AppError::not_found("Job not found"));
        }
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(school.user_id),
                    ActivityAction::JobDeleted,
                    json!({ "jobId": id, "jobTitle": job.title }),
                )
                .with_meta(meta),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::application_repository::{
        ApplicationRepository, NewApplication,
    };
    use crate::application::test_support::Fixture;
    use crate::domain::applications::application::Applicant;

    #[tokio::test]
    async fn jobs_with_applications_must_be_closed_instead() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let teacher = fx.add_teacher();
        let job = fx.add_job(&school, JobStatus::Active, 4);
        let empty = fx.add_job(&school, JobStatus::Active, 4);
        ApplicationRepository::create(
            fx.store.as_ref(),
            &NewApplication {
                job_id: job.id,
                applicant: Applicant::Teacher(teacher.id),
                cover_letter: None,
                resume_url: "memory://cv.pdf".into(),
                portfolio_url: None,
                update_teacher_resume: false,
            },
        )
        .await
        .unwrap();

        let uc = DeleteJob {
            jobs: &*fx.jobs,
            notifications: &fx.notifications,
        };
        let meta = RequestMeta::default();
        assert!(matches!(
            uc.execute(&school, job.id, &meta).await.unwrap_err(),
            AppError::Validation { .. }
        ));
        uc.execute(&school, empty.id, &meta).await.unwrap();
        assert!(fx.store.job(empty.id).is_none());
        assert_eq!(fx.activity.actions(), vec![ActivityAction::JobDeleted]);
    }
}
