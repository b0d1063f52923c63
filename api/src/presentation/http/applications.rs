use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::access::{require_school, require_teacher};
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::application_repository::ApplicationView;
use crate::application::use_cases::applications::application_notes::{AddNote, ListNotes};
use crate::application::use_cases::applications::list_applications::ListApplications;
use crate::application::use_cases::applications::submit_application::{
    GuestSubmission, SubmitApplication, Submitted, TeacherSubmission,
};
use crate::application::use_cases::applications::update_application_status::{
    StatusUpdateRequest, UpdateApplicationStatus,
};
use crate::bootstrap::app_context::AppContext;
use crate::domain::applications::application::{
    Applicant, Application, ApplicationNote, ApplicationStatus, GuestApplicant,
};
use crate::presentation::http::auth::AuthUser;
use crate::presentation::http::extract::{
    ClientMeta, FormData, JsonBody, parse_timestamp, read_form,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuestResponse {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    pub application_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ApplicationNote> for NoteResponse {
    fn from(n: ApplicationNote) -> Self {
        Self {
            id: n.id,
            application_id: n.application_id,
            author_name: n.author_name,
            content: n.content,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub is_guest_application: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestResponse>,
    #[schema(value_type = String)]
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub interview_date: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_email: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<NoteResponse>,
}

impl From<Application> for ApplicationResponse {
    fn from(a: Application) -> Self {
        let (teacher_id, guest) = match a.applicant {
            Applicant::Teacher(id) => (Some(id), None),
            Applicant::Guest(g) => (
                None,
                Some(GuestResponse {
                    first_name: g.first_name,
                    last_name: g.last_name,
                    email: g.email,
                    phone: g.phone,
                    city: g.city,
                    country: g.country,
                }),
            ),
        };
        Self {
            id: a.id,
            job_id: a.job_id,
            teacher_id,
            is_guest_application: guest.is_some(),
            guest,
            status: a.status,
            cover_letter: a.cover_letter,
            resume_url: a.resume_url,
            portfolio_url: a.portfolio_url,
            interview_date: a.interview_date,
            rating: a.rating,
            applied_at: a.created_at,
            updated_at: a.updated_at,
            job_title: None,
            school_name: None,
            applicant_name: None,
            applicant_email: None,
            notes: Vec::new(),
        }
    }
}

impl From<ApplicationView> for ApplicationResponse {
    fn from(v: ApplicationView) -> Self {
        let mut out = ApplicationResponse::from(v.application);
        out.job_title = Some(v.job_title);
        out.school_name = Some(v.school_name);
        out.applicant_name = Some(v.applicant_name);
        out.applicant_email = Some(v.applicant_email);
        out.notes = v.notes.into_iter().map(NoteResponse::from).collect();
        out
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmittedJob {
    pub title: String,
    pub company: String,
    pub location: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    #[schema(value_type = String)]
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub job: SubmittedJob,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmittedResponse {
    pub message: String,
    pub application: SubmittedApplication,
}

impl SubmittedResponse {
    fn new(message: &str, s: Submitted) -> Self {
        Self {
            message: message.to_string(),
            application: SubmittedApplication {
                id: s.application.id,
                job_id: s.application.job_id,
                status: s.application.status,
                applied_at: s.application.created_at,
                job: SubmittedJob {
                    location: s.job.location(),
                    title: s.job.title,
                    company: s.school_name,
                },
            },
        }
    }
}

#[derive(ToSchema)]
#[allow(dead_code, non_snake_case)]
pub struct SubmitApplicationMultipart {
    #[schema(value_type = String, format = Uuid)]
    jobId: String,
    coverLetter: Option<String>,
    /// `true` reuses the resume stored on the teacher profile.
    useExistingResume: Option<bool>,
    /// PDF, DOC or DOCX
    #[schema(value_type = Option<String>, format = Binary)]
    cv: Option<String>,
}

#[derive(ToSchema)]
#[allow(dead_code, non_snake_case)]
pub struct GuestApplicationMultipart {
    #[schema(value_type = String, format = Uuid)]
    jobId: String,
    firstName: String,
    lastName: String,
    email: String,
    phone: Option<String>,
    city: Option<String>,
    country: Option<String>,
    coverLetter: Option<String>,
    #[schema(value_type = String, format = Binary)]
    cv: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub note: Option<String>,
    pub interview_date: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationChangedResponse {
    pub message: String,
    pub application: ApplicationResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoteListResponse {
    pub notes: Vec<NoteResponse>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct AddNoteRequest {
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoteAddedResponse {
    pub message: String,
    pub note: NoteResponse,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route(
            "/applications",
            get(list_applications).post(submit_application),
        )
        .route("/applications/guest", post(submit_guest_application))
        .route("/applications/:id/status", patch(update_application_status))
        .route("/applications/:id/notes", get(list_notes).post(add_note))
        .with_state(ctx)
}

/// Unparseable ids cannot name a job.
fn job_id_from(form: &FormData) -> AppResult<Uuid> {
    let raw = form
        .text("jobId")
        .ok_or_else(|| AppError::validation("Job ID is required"))?;
    Uuid::parse_str(&raw).map_err(|_| AppError::not_found("Job not found"))
}

#[utoipa::path(post, path = "/api/applications", tag = "Applications",
    request_body(content = SubmitApplicationMultipart, content_type = "multipart/form-data"),
    responses(
        (status = 201, body = SubmittedResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn submit_application(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<SubmittedResponse>)> {
    let profiles = ctx.profile_repo();
    let teacher =
        require_teacher(profiles.as_ref(), &actor, "Only teachers can apply for jobs").await?;
    let mut form = read_form(
        multipart,
        ctx.upload_limit(),
        ctx.cfg.upload_tmp_dir.as_deref(),
    )
    .await?;
    let submission = TeacherSubmission {
        job_id: job_id_from(&form)?,
        cover_letter: form.text("coverLetter"),
        use_existing_resume: form.flag("useExistingResume"),
        resume: form.take_file("cv"),
    };

    let jobs = ctx.job_repo();
    let applications = ctx.application_repo();
    let blobs = ctx.blob_storage();
    let uc = SubmitApplication {
        jobs: jobs.as_ref(),
        applications: applications.as_ref(),
        profiles: profiles.as_ref(),
        blobs: blobs.as_ref(),
        notifications: ctx.notifications(),
        max_upload_bytes: ctx.upload_limit(),
    };
    let submitted = uc.as_teacher(&teacher, submission, &meta, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmittedResponse::new(
            "Application submitted successfully",
            submitted,
        )),
    ))
}

#[utoipa::path(post, path = "/api/applications/guest", tag = "Applications", security(()),
    request_body(content = GuestApplicationMultipart, content_type = "multipart/form-data"),
    responses(
        (status = 201, body = SubmittedResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn submit_guest_application(
    State(ctx): State<AppContext>,
    ClientMeta(meta): ClientMeta,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<SubmittedResponse>)> {
    let mut form = read_form(
        multipart,
        ctx.upload_limit(),
        ctx.cfg.upload_tmp_dir.as_deref(),
    )
    .await?;
    let submission = GuestSubmission {
        job_id: job_id_from(&form)?,
        guest: GuestApplicant {
            first_name: form.text("firstName").unwrap_or_default(),
            last_name: form.text("lastName").unwrap_or_default(),
            email: form.text("email").unwrap_or_default(),
            phone: form.text("phone"),
            city: form.text("city"),
            country: form.text("country"),
        },
        cover_letter: form.text("coverLetter"),
        resume: form.take_file("cv"),
    };

    let jobs = ctx.job_repo();
    let applications = ctx.application_repo();
    let profiles = ctx.profile_repo();
    let blobs = ctx.blob_storage();
    let uc = SubmitApplication {
        jobs: jobs.as_ref(),
        applications: applications.as_ref(),
        profiles: profiles.as_ref(),
        blobs: blobs.as_ref(),
        notifications: ctx.notifications(),
        max_upload_bytes: ctx.upload_limit(),
    };
    let submitted = uc.as_guest(submission, &meta, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmittedResponse::new(
            "Application submitted successfully! Check your email for confirmation.",
            submitted,
        )),
    ))
}

#[utoipa::path(get, path = "/api/applications", tag = "Applications", responses((status = 200, body = ApplicationListResponse)))]
pub async fn list_applications(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<ApplicationListResponse>> {
    let applications = ctx.application_repo();
    let profiles = ctx.profile_repo();
    let uc = ListApplications {
        applications: applications.as_ref(),
        profiles: profiles.as_ref(),
    };
    let views = uc.execute(&actor).await?;
    Ok(Json(ApplicationListResponse {
        applications: views.into_iter().map(ApplicationResponse::from).collect(),
    }))
}

#[utoipa::path(patch, path = "/api/applications/{id}/status", tag = "Applications",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateStatusRequest,
    responses((status = 200, body = ApplicationChangedResponse))
)]
pub async fn update_application_status(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> AppResult<Json<ApplicationChangedResponse>> {
    let profiles = ctx.profile_repo();
    let school = require_school(
        profiles.as_ref(),
        &actor,
        "Only schools can update application status",
    )
    .await?;
    let interview_date = match req.interview_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            parse_timestamp(raw)
                .ok_or_else(|| AppError::validation("Invalid interview date"))?,
        ),
    };
    let applications = ctx.application_repo();
    let uc = UpdateApplicationStatus {
        applications: applications.as_ref(),
        notifications: ctx.notifications(),
    };
    let update = StatusUpdateRequest {
        status: req.status,
        note: req.note,
        interview_date,
        rating: req.rating,
    };
    let application = uc.execute(&school, id, update, &meta).await?;
    Ok(Json(ApplicationChangedResponse {
        message: "Application status updated successfully".into(),
        application: application.into(),
    }))
}

#[utoipa::path(get, path = "/api/applications/{id}/notes", tag = "Applications",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses((status = 200, body = NoteListResponse))
)]
pub async fn list_notes(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<NoteListResponse>> {
    let profiles = ctx.profile_repo();
    let school =
        require_school(profiles.as_ref(), &actor, "Only schools can view notes").await?;
    let applications = ctx.application_repo();
    let uc = ListNotes {
        applications: applications.as_ref(),
    };
    let notes = uc.execute(&school, id).await?;
    Ok(Json(NoteListResponse {
        notes: notes.into_iter().map(NoteResponse::from).collect(),
    }))
}

#[utoipa::path(post, path = "/api/applications/{id}/notes", tag = "Applications",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = AddNoteRequest,
    responses((status = 201, body = NoteAddedResponse))
)]
pub async fn add_note(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<AddNoteRequest>,
) -> AppResult<(StatusCode, Json<NoteAddedResponse>)> {
    let profiles = ctx.profile_repo();
    let school = require_school(profiles.as_ref(), &actor, "Only schools can add notes").await?;
    let applications = ctx.application_repo();
    let uc = AddNote {
        applications: applications.as_ref(),
        notifications: ctx.notifications(),
    };
    let note = uc.execute(&school, id, &req.content, &meta).await?;
    Ok((
        StatusCode::CREATED,
        Json(NoteAddedResponse {
            message: "Note added successfully".into(),
            note: note.into(),
        }),
    ))
}
