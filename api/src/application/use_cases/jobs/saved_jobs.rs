use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::application::access::{Actor, require_teacher};
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::job_repository::{JobRepository, SavedJob};
use crate::application::ports::profile_repository::ProfileRepository;
use crate::application::services::notifications::Notifications;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::jobs::job::{Job, JobStatus};

const TEACHER_ONLY: &str = "Teacher access required";

pub struct ListSavedJobs<'a, P, J>
where
    P: ProfileRepository + ?Sized,
    J: JobRepository + ?Sized,
{
    pub profiles: &'a P,
    pub jobs: &'a J,
}

impl<'a, P, J> ListSavedJobs<'a, P, J>
where
    P: ProfileRepository + ?Sized,
    J: JobRepository + ?Sized,
{
    pub async fn execute(&self, actor: &Actor) -> AppResult<Vec<SavedJob>> {
        let teacher = require_teacher(self.profiles, actor, TEACHER_ONLY).await?;
        Ok(self.jobs.list_saved(teacher.id).await?)
    }
}

/// Bookmarks an active job once per teacher.
pub struct SaveJob<'a, P, J>
where
    P: ProfileRepository + ?Sized,
    J: JobRepository + ?Sized,
{
    pub profiles: &'a P,
    pub jobs: &'a J,
    pub notifications: &'a Notifications,
}

impl<'a, P, J> SaveJob<'a, P, J>
where
    P: ProfileRepository + ?Sized,
    J: JobRepository + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &Actor,
        job_id: Uuid,
        meta: &RequestMeta,
    ) -> AppResult<(Job, DateTime<Utc>)> {
        let teacher = require_teacher(self.profiles, actor, TEACHER_ONLY).await?;
        let job = self
            .jobs
            .find(job_id)
            .await?
            .ok_or_else(|| AppError::not_found("Job not found"))?;
        if job.status != JobStatus::Active {
            return Err(AppError::validation("This job is no longer active"));
        }
        let saved_at = self
            .jobs
            .add_saved(teacher.id, job_id)
            .await?
            .ok_or_else(|| AppError::validation("Job already saved"))?;
        tracing::info!(teacher_id = %teacher.id, job_id = %job_id, "job_saved");
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(actor.user_id),
                    ActivityAction::JobSaved,
                    json!({ "jobId": job_id, "jobTitle": job.title }),
                )
                .with_meta(meta),
            )
            .await;
        Ok((job, saved_at))
    }
}

pub struct UnsaveJob<'a, P, J>
where
    P: ProfileRepository + ?Sized,
    J: JobRepository + ?Sized,
{
    pub profiles: &'a P,
    pub jobs: &'a J,
    pub notifications: &'a Notifications,
}

impl<'a, P, J> UnsaveJob<'a, P, J>
where
    P: ProfileRepository + ?Sized,
    J: JobRepository + ?Sized,
{
    pub async fn execute(&self, actor: &Actor, job_id: Uuid, meta: &RequestMeta) -> AppResult<()> {
        let teacher = require_teacher(self.profiles, actor, TEACHER_ONLY).await?;
        if !self.jobs.remove_saved(teacher.id, job_id).await? {
            return Err(AppError::not_found("Saved job not found"));
        }
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(actor.user_id),
                    ActivityAction::JobUnsaved,
                    json!({ "jobId": job_id }),
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
    use crate::application::ports::application_repository::{ApplicationRepository, NewApplication};
    use crate::application::test_support::{Fixture, school_actor, teacher_actor};
    use crate::domain::applications::application::{Applicant, ApplicationStatus};

    #[tokio::test]
    async fn saving_twice_is_refused() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let teacher = fx.add_teacher();
        let job = fx.add_job(&school, JobStatus::Active, 10);
        let uc = SaveJob {
            profiles: &*fx.profiles,
            jobs: &*fx.jobs,
            notifications: &fx.notifications,
        };
        let actor = teacher_actor(&teacher);
        uc.execute(&actor, job.id, &RequestMeta::default()).await.unwrap();
        let err = uc
            .execute(&actor, job.id, &RequestMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref message, .. } if message == "Job already saved"));
        assert_eq!(fx.store.saved_job_ids(teacher.id), vec![job.id]);
    }

    #[tokio::test]
    async fn only_active_jobs_can_be_saved() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let teacher = fx.add_teacher();
        let paused = fx.add_job(&school, JobStatus::Paused, 10);
        let uc = SaveJob {
            profiles: &*fx.profiles,
            jobs: &*fx.jobs,
            notifications: &fx.notifications,
        };
        let err = uc
            .execute(&teacher_actor(&teacher), paused.id, &RequestMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = uc
            .execute(&teacher_actor(&teacher), Uuid::new_v4(), &RequestMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = uc
            .execute(&school_actor(&school), paused.id, &RequestMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn listing_carries_own_application() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let teacher = fx.add_teacher();
        let applied = fx.add_job(&school, JobStatus::Active, 10);
        let browsing = fx.add_job(&school, JobStatus::Active, 20);
        for id in [applied.id, browsing.id] {
            fx.jobs.add_saved(teacher.id, id).await.unwrap();
        }
        ApplicationRepository::create(
            fx.store.as_ref(),
            &NewApplication {
                job_id: applied.id,
                applicant: Applicant::Teacher(teacher.id),
                cover_letter: None,
                resume_url: "memory://cv.pdf".into(),
                portfolio_url: None,
                update_teacher_resume: false,
            },
        )
        .await
        .unwrap();

        let saved = ListSavedJobs {
            profiles: &*fx.profiles,
            jobs: &*fx.jobs,
        }
        .execute(&teacher_actor(&teacher))
        .await
        .unwrap();
        assert_eq!(saved.len(), 2);
        let mine = saved.iter().find(|s| s.listing.job.id == applied.id).unwrap();
        assert_eq!(mine.application.map(|(s, _)| s), Some(ApplicationStatus::Applied));
        let other = saved.iter().find(|s| s.listing.job.id == browsing.id).unwrap();
        assert!(other.application.is_none());
    }

    #[tokio::test]
    async fn unsaving_unknown_bookmark_is_not_found() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let teacher = fx.add_teacher();
        let job = fx.add_job(&school, JobStatus::Active, 10);
        fx.jobs.add_saved(teacher.id, job.id).await.unwrap();
        let uc = UnsaveJob {
            profiles: &*fx.profiles,
            jobs: &*fx.jobs,
            notifications: &fx.notifications,
        };
        let actor = teacher_actor(&teacher);
        uc.execute(&actor, job.id, &RequestMeta::default()).await.unwrap();
        assert!(fx.store.saved_job_ids(teacher.id).is_empty());
        let err = uc
            .execute(&actor, job.id, &RequestMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(m) if m == "Saved job not found"));
        assert!(
            fx.activity
                .entries()
                .iter()
                .any(|e| e.action == ActivityAction::JobUnsaved)
        );
    }
}
