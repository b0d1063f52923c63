use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::applications::application::{
    Applicant, Application, ApplicationNote, ApplicationStatus,
};

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub applicant: Applicant,
    pub cover_letter: Option<String>,
    pub resume_url: String,
    pub portfolio_url: Option<String>,
    /// Set when a fresh resume was uploaded; stored on the teacher profile in the same transaction.
    pub update_teacher_resume: bool,
}

/// An application joined with the names needed for listings and emails.
#[derive(Debug, Clone)]
pub struct ApplicationView {
    pub application: Application,
    pub job_title: String,
    pub school_id: Uuid,
    pub school_name: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub notes: Vec<ApplicationNote>,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: ApplicationStatus,
    pub interview_date: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub note: Option<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ApplicantContact {
    pub name: String,
    pub email: String,
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn exists_for_teacher(&self, job_id: Uuid, teacher_id: Uuid) -> anyhow::Result<bool>;
    async fn exists_for_guest(&self, job_id: Uuid, email: &str) -> anyhow::Result<bool>;
    /// `None` when the applicant already applied; the unique index decides races.
    async fn create(&self, new: &NewApplication) -> anyhow::Result<Option<Application>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<ApplicationView>>;
    async fn list_for_job(&self, job_id: Uuid) -> anyhow::Result<Vec<ApplicationView>>;
    async fn list_for_school(&self, school_id: Uuid) -> anyhow::Result<Vec<ApplicationView>>;
    async fn list_for_teacher(&self, teacher_id: Uuid) -> anyhow::Result<Vec<ApplicationView>>;
    /// Status update and optional `(author, content)` note in one transaction.
    async fn update_status(&self, id: Uuid, change: &StatusChange)
    -> anyhow::Result<Application>;
    async fn add_note(
        &self,
        application_id: Uuid,
        author_name: &str,
        content: &str,
    ) -> anyhow::Result<ApplicationNote>;
    async fn list_notes(&self, application_id: Uuid) -> anyhow::Result<Vec<ApplicationNote>>;
    async fn pending_applicants(&self, job_id: Uuid) -> anyhow::Result<Vec<ApplicantContact>>;
}
