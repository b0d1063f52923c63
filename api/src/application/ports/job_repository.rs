use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::applications::application::ApplicationStatus;
use crate::domain::jobs::board::BoardQuery;
use crate::domain::jobs::job::{Job, JobStatus, NewJob};

#[derive(Debug, Clone)]
pub struct JobListing {
    pub job: Job,
    pub school_name: String,
    pub school_logo_url: Option<String>,
    pub application_count: i64,
}

/// One page of matches plus the number of matches across all pages.
#[derive(Debug, Clone, Default)]
pub struct JobPage {
    pub listings: Vec<JobListing>,
    pub total: u64,
}

/// A teacher's bookmark, with their own application to the job if any.
#[derive(Debug, Clone)]
pub struct SavedJob {
    pub listing: JobListing,
    pub saved_at: DateTime<Utc>,
    pub application: Option<(ApplicationStatus, DateTime<Utc>)>,
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Job>>;
    async fn list_for_school(&self, school_id: Uuid) -> anyhow::Result<Vec<JobListing>>;
    async fn list_active(&self) -> anyhow::Result<Vec<JobListing>>;
    /// Filters, orders and pages the board as [`BoardQuery::matches`] and
    /// [`JobSort::compare`](crate::domain::jobs::board::JobSort::compare) describe.
    async fn search_public(&self, query: &BoardQuery, now: DateTime<Utc>)
    -> anyhow::Result<JobPage>;
    async fn create(&self, school_id: Uuid, job: &NewJob) -> anyhow::Result<Job>;
    /// Writes every editable column of `job`.
    async fn update(&self, job: &Job) -> anyhow::Result<Job>;
    async fn set_status(&self, id: Uuid, status: JobStatus) -> anyhow::Result<Job>;
    /// Moves the given jobs to CLOSED; returns how many rows changed.
    async fn close_many(&self, ids: &[Uuid]) -> anyhow::Result<u64>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn count_applications(&self, id: Uuid) -> anyhow::Result<i64>;
    /// Newest bookmark first.
    async fn list_saved(&self, teacher_id: Uuid) -> anyhow::Result<Vec<SavedJob>>;
    /// `None` when the job was already saved.
    async fn add_saved(&self, teacher_id: Uuid, job_id: Uuid)
    -> anyhow::Result<Option<DateTime<Utc>>>;
    async fn remove_saved(&self, teacher_id: Uuid, job_id: Uuid) -> anyhow::Result<bool>;
}
