use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::job_repository::{JobListing, JobRepository};
use crate::application::ports::profile_repository::ProfileRepository;
use crate::domain::accounts::user::UserType;
use crate::domain::jobs::job::JobStatus;

/// A school's own postings, or the ACTIVE board for teachers.
///
/// For schools, ACTIVE jobs whose deadline day is over are moved to CLOSED
/// before the list is returned.
pub struct ListJobs<'a, J, P>
where
    J: JobRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    pub jobs: &'a J,
    pub profiles: &'a P,
}

impl<'a, J, P> ListJobs<'a, J, P>
where
    J: JobRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    pub async fn execute(&self, actor: &Actor, now: DateTime<Utc>) -> AppResult<Vec<JobListing>> {
        match actor.user_type {
            UserType::Teacher => Ok(self.jobs.list_active().await?),
            UserType::School => {
                let school = self
                    .profiles
                    .school_by_user(actor.user_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("School profile not found"))?;
                let mut listings = self.jobs.list_for_school(school.id).await?;
                let expired: Vec<Uuid> = listings
                    .iter()
                    .filter(|l| l.job.needs_auto_close(now))
                    .map(|l| l.job.id)
                    .collect();
                if !expired.is_empty() {
                    let closed = self.jobs.close_many(&expired).await?;
                    info!(school_id = %school.id, closed, "jobs_auto_closed");
                    for listing in listings.iter_mut() {
                        if expired.contains(&listing.job.id) {
                            listing.job.status = JobStatus::Closed;
                        }
                    }
                }
                Ok(listings)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{Fixture, school_actor, teacher_actor};
    use chrono::Duration;

    #[tokio::test]
    async fn expired_active_jobs_are_closed_on_listing() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let stale = fx.add_job(&school, JobStatus::Active, -2);
        let fresh = fx.add_job(&school, JobStatus::Active, 2);
        let paused = fx.add_job(&school, JobStatus::Paused, -2);

        let uc = ListJobs {
            jobs: &*fx.jobs,
            profiles: &*fx.profiles,
        };
        let listed = uc.execute(&school_actor(&school), Utc::now()).await.unwrap();
        let status_of = |id: Uuid| listed.iter().find(|l| l.job.id == id).unwrap().job.status;
        assert_eq!(status_of(stale.id), JobStatus::Closed);
        assert_eq!(status_of(fresh.id), JobStatus::Active);
        assert_eq!(status_of(paused.id), JobStatus::Paused);
        assert_eq!(fx.store.job(stale.id).unwrap().status, JobStatus::Closed);
    }

    #[tokio::test]
    async fn deadline_day_itself_stays_open() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let job = fx.add_job(&school, JobStatus::Active, 0);
        let uc = ListJobs {
            jobs: &*fx.jobs,
            profiles: &*fx.profiles,
        };
        let late_same_day = job
            .deadline
            .date_naive()
            .and_hms_opt(23, 59, 0)
            .unwrap()
            .and_utc()
            .max(job.deadline + Duration::seconds(1));
        let listed = uc
            .execute(&school_actor(&school), late_same_day)
            .await
            .unwrap();
        assert_eq!(listed[0].job.status, JobStatus::Active);
    }

    #[tokio::test]
    async fn teachers_get_the_active_board() {
        let fx = Fixture::new();
        let school = fx.add_school();
        fx.add_job(&school, JobStatus::Active, 2);
        fx.add_job(&school, JobStatus::Draft, 2);
        let teacher = fx.add_teacher();
        let uc = ListJobs {
            jobs: &*fx.jobs,
            profiles: &*fx.profiles,
        };
        let listed = uc.execute(&teacher_actor(&teacher), Utc::now()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].school_name, school.name);
    }
}
