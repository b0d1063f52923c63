use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::application_repository::{ApplicationRepository, NewApplication};
use crate::application::ports::blob_storage::BlobStorage;
use crate::application::ports::job_repository::JobRepository;
use crate::application::ports::profile_repository::ProfileRepository;
use crate::application::services::email::EmailTemplate;
use crate::application::services::notifications::Notifications;
use crate::application::services::uploads::StagedFile;
use crate::domain::accounts::user::{SchoolProfile, TeacherProfile};
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::applications::application::{
    Applicant, Application, GuestApplicant, is_valid_email,
};
use crate::domain::jobs::job::Job;
use crate::domain::uploads::upload::{
    INVALID_RESUME_TYPE, RESUME_MIME_TYPES, ResumeOwner, blob_nonce, resume_blob_path,
};

pub const RESUME_REQUIRED: &str =
    "CV/Resume is required. Please upload a CV or ensure you have one on file.";

#[derive(Debug)]
pub struct TeacherSubmission {
    pub job_id: Uuid,
    pub cover_letter: Option<String>,
    pub use_existing_resume: bool,
    pub resume: Option<StagedFile>,
}

#[derive(Debug)]
pub struct GuestSubmission {
    pub job_id: Uuid,
    pub guest: GuestApplicant,
    pub cover_letter: Option<String>,
    pub resume: Option<StagedFile>,
}

#[derive(Debug, Clone)]
pub struct Submitted {
    pub application: Application,
    pub job: Job,
    pub school_name: String,
}

enum Resume {
    Fresh(StagedFile),
    OnFile(String),
}

/// Validates and records a job application from a teacher or a guest.
///
/// Checks run in a fixed order: the job exists, it is ACTIVE, its deadline has
/// not passed, the applicant has not applied yet, and a resume is available.
/// Nothing is written until every check passes. Staged uploads are removed on
/// every path, and a blob stored for a losing insert is deleted again.
pub struct SubmitApplication<'a, J, A, P, B>
where
    J: JobRepository + ?Sized,
    A: ApplicationRepository + ?Sized,
    P: ProfileRepository + ?Sized,
    B: BlobStorage + ?Sized,
{
    pub jobs: &'a J,
    pub applications: &'a A,
    pub profiles: &'a P,
    pub blobs: &'a B,
    pub notifications: &'a Notifications,
    pub max_upload_bytes: u64,
}

impl<'a, J, A, P, B> SubmitApplication<'a, J, A, P, B>
where
    J: JobRepository + ?Sized,
    A: ApplicationRepository + ?Sized,
    P: ProfileRepository + ?Sized,
    B: BlobStorage + ?Sized,
{
    pub async fn as_teacher(
        &self,
        teacher: &TeacherProfile,
        req: TeacherSubmission,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> AppResult<Submitted> {
        let applicant = Applicant::Teacher(teacher.id);
        let job = self.open_job(req.job_id, now).await?;
        self.ensure_first(&job, &applicant).await?;

        let resume = match req.resume {
            Some(file) => Resume::Fresh(self.checked(file)?),
            None => match teacher.resume_url.as_deref() {
                Some(url) if req.use_existing_resume && !url.is_empty() => {
                    Resume::OnFile(url.to_string())
                }
                _ => return Err(AppError::validation(RESUME_REQUIRED)),
            },
        };
        let name = teacher.path_name();
        let id = teacher.id.to_string();
        let owner = ResumeOwner::Teacher {
            name: &name,
            id: &id,
        };
        let (resume_url, fresh) = self.store_resume(resume, owner, now).await?;

        let application = self
            .insert(
                NewApplication {
                    job_id: job.id,
                    applicant,
                    cover_letter: req.cover_letter.clone(),
                    resume_url,
                    portfolio_url: teacher.portfolio_url.clone(),
                    update_teacher_resume: fresh.is_some(),
                },
                fresh.as_deref(),
            )
            .await?;
        info!(application_id = %application.id, job_id = %job.id, teacher_id = %teacher.id, "application_submitted");

        self.notifications
            .record(
                ActivityEntry::new(
                    Some(teacher.user_id),
                    ActivityAction::JobApplicationSubmitted,
                    json!({
                        "applicationId": application.id,
                        "jobId": job.id,
                        "jobTitle": job.title,
                        "resumeUploaded": fresh.is_some(),
                    }),
                )
                .with_meta(meta),
            )
            .await;

        let school = self.profiles.school_by_id(job.school_id).await.ok().flatten();
        if let Some(school) = &school {
            self.notifications
                .email(
                    school.notification_email(),
                    EmailTemplate::ApplicationReceived {
                        job_title: job.title.clone(),
                        job_location: job.location(),
                        teacher_name: teacher.full_name(),
                        teacher_qualification: teacher.qualification.clone().unwrap_or_default(),
                        teacher_experience: teacher.experience_label(),
                        teacher_location: teacher.location(),
                        cover_letter: req.cover_letter,
                    },
                    Some(school.user_id),
                )
                .await;
        }

        Ok(Submitted {
            application,
            school_name: school.map(|s| s.name).unwrap_or_default(),
            job,
        })
    }

    pub async fn as_guest(
        &self,
        req: GuestSubmission,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> AppResult<Submitted> {
        let mut guest = req.guest;
        guest.first_name = guest.first_name.trim().to_string();
        guest.last_name = guest.last_name.trim().to_string();
        guest.email = guest.normalized_email();
        if guest.first_name.is_empty() || guest.last_name.is_empty() || guest.email.is_empty() {
            return Err(AppError::validation(
                "First name, last name, and email are required",
            ));
        }
        if !is_valid_email(&guest.email) {
            return Err(AppError::validation("Please provide a valid email address"));
        }

        let applicant = Applicant::Guest(guest.clone());
        let job = self.open_job(req.job_id, now).await?;
        self.ensure_first(&job, &applicant).await?;

        let file = req
            .resume
            .ok_or_else(|| AppError::validation(RESUME_REQUIRED))?;
        let resume = Resume::Fresh(self.checked(file)?);
        let name = guest.path_name();
        let owner = ResumeOwner::Guest { name: &name };
        let (resume_url, fresh) = self.store_resume(resume, owner, now).await?;

        let application = self
            .insert(
                NewApplication {
                    job_id: job.id,
                    applicant,
                    cover_letter: req.cover_letter.clone(),
                    resume_url,
                    portfolio_url: None,
                    update_teacher_resume: false,
                },
                fresh.as_deref(),
            )
            .await?;
        info!(application_id = %application.id, job_id = %job.id, "guest_application_submitted");

        self.notifications
            .record(
                ActivityEntry::new(
                    None,
                    ActivityAction::GuestApplicationSubmitted,
                    json!({
                        "applicationId": application.id,
                        "jobId": job.id,
                        "jobTitle": job.title,
                        "guestEmail": guest.email,
                        "guestName": guest.full_name(),
                    }),
                )
                .with_meta(meta),
            )
            .await;

        let school = self.profiles.school_by_id(job.school_id).await.ok().flatten();
        let school_name = school.as_ref().map(|s| s.name.clone()).unwrap_or_default();
        if let Some(school) = &school {
            self.notify_school_of_guest(school, &job, &guest, req.cover_letter)
                .await;
        }
        self.notifications
            .email(
                &guest.email,
                EmailTemplate::GuestApplicationConfirmation {
                    first_name: guest.first_name.clone(),
                    job_title: job.title.clone(),
                    school_name: school_name.clone(),
                    location: job.location(),
                    application_id: application.id.to_string(),
                },
                None,
            )
            .await;

        Ok(Submitted {
            application,
            job,
            school_name,
        })
    }

    /// The job must exist, be ACTIVE and still be before its deadline.
    async fn open_job(&self, job_id: Uuid, now: DateTime<Utc>) -> AppResult<Job> {
        let job = self
            .jobs
            .find(job_id)
            .await?
            .ok_or_else(|| AppError::not_found("Job not found"))?;
        job.check_accepting(now)
            .map_err(|refusal| AppError::validation(refusal.message()))?;
        Ok(job)
    }

    async fn ensure_first(&self, job: &Job, applicant: &Applicant) -> AppResult<()> {
        let exists = match applicant {
            Applicant::Teacher(id) => self.applications.exists_for_teacher(job.id, *id).await?,
            Applicant::Guest(g) => {
                self.applications
                    .exists_for_guest(job.id, &g.normalized_email())
                    .await?
            }
        };
        if exists {
            return Err(AppError::validation(applicant.duplicate_message()));
        }
        Ok(())
    }

    fn checked(&self, file: StagedFile) -> AppResult<StagedFile> {
        if !RESUME_MIME_TYPES.contains(&file.content_type.as_str()) {
            file.discard();
            return Err(AppError::validation(INVALID_RESUME_TYPE));
        }
        if file.size > self.max_upload_bytes {
            file.discard();
            return Err(AppError::validation(format!(
                "File size too large. Maximum size is {}MB",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }
        Ok(file)
    }

    /// Returns the resume URL and, for a fresh upload, the blob to roll back.
    async fn store_resume(
        &self,
        resume: Resume,
        owner: ResumeOwner<'_>,
        now: DateTime<Utc>,
    ) -> AppResult<(String, Option<String>)> {
        match resume {
            Resume::OnFile(url) => Ok((url, None)),
            Resume::Fresh(file) => {
                let key = resume_blob_path(
                    owner,
                    file.original_name.as_deref(),
                    &file.content_type,
                    now.timestamp_millis(),
                    &blob_nonce(),
                );
                let stored = self
                    .blobs
                    .put_file(&key, file.path(), &file.content_type)
                    .await;
                file.discard();
                let stored = stored.map_err(|err| {
                    tracing::error!(error = ?err, key = %key, "resume_upload_failed");
                    AppError::Internal(err.context("Failed to upload CV. Please try again."))
                })?;
                Ok((stored.url.clone(), Some(stored.url)))
            }
        }
    }

    async fn insert(
        &self,
        new: NewApplication,
        fresh_blob: Option<&str>,
    ) -> AppResult<Application> {
        match self.applications.create(&new).await {
            Ok(Some(application)) => Ok(application),
            Ok(None) => {
                self.rollback_blob(fresh_blob).await;
                Err(AppError::validation(new.applicant.duplicate_message()))
            }
            Err(err) => {
                self.rollback_blob(fresh_blob).await;
                Err(err.into())
            }
        }
    }

    async fn rollback_blob(&self, url: Option<&str>) {
        if let Some(url) = url {
            if let Err(e) = self.blobs.delete(url).await {
                warn!(error = ?e, url = %url, "resume_rollback_failed");
            }
        }
    }

    async fn notify_school_of_guest(
        &self,
        school: &SchoolProfile,
        job: &Job,
        guest: &GuestApplicant,
        cover_letter: Option<String>,
    ) {
        self.notifications
            .email(
                school.notification_email(),
                EmailTemplate::ApplicationReceived {
                    job_title: job.title.clone(),
                    job_location: job.location(),
                    teacher_name: format!("{} (Guest Applicant)", guest.full_name()),
                    teacher_qualification: "Not specified".into(),
                    teacher_experience: "Not specified".into(),
                    teacher_location: guest.location(),
                    cover_letter,
                },
                Some(school.user_id),
            )
            .await;
    }
}
