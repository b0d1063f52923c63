use chrono::{DateTime, Utc};

use crate::application::errors::AppResult;
use crate::application::ports::job_repository::{JobPage, JobRepository};
use crate::domain::jobs::board::BoardQuery;

/// Unauthenticated board: ACTIVE jobs whose deadline is today or later,
/// filtered, ordered and paged by the repository.
pub struct PublicJobs<'a, J: JobRepository + ?Sized> {
    pub jobs: &'a J,
}

impl<'a, J: JobRepository + ?Sized> PublicJobs<'a, J> {
    pub async fn execute(&self, query: BoardQuery, now: DateTime<Utc>) -> AppResult<JobPage> {
        let query = query.normalized();
        Ok(self.jobs.search_public(&query, now).await?)
    }
}
