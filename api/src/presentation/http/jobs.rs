use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::access::{require_owned_job, require_school};
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::job_repository::JobListing;
use crate::application::use_cases::jobs::create_job::CreateJob;
use crate::application::use_cases::jobs::delete_job::DeleteJob;
use crate::application::use_cases::jobs::get_job::GetJob;
use crate::application::use_cases::jobs::job_applications::JobApplications;
use crate::application::use_cases::jobs::list_jobs::ListJobs;
use crate::application::use_cases::jobs::public_jobs::PublicJobs;
use crate::application::use_cases::jobs::update_job::UpdateJob;
use crate::application::use_cases::jobs::update_job_status::UpdateJobStatus;
use crate::bootstrap::app_context::AppContext;
use crate::domain::applications::application::ApplicationStatus;
use crate::domain::jobs::board::{BoardQuery, DeadlineWindow, JobSort};
use crate::domain::jobs::job::{Job, JobChanges, JobStatus, NewJob};
use crate::presentation::http::applications::ApplicationResponse;
use crate::presentation::http::auth::AuthUser;
use crate::presentation::http::extract::{ClientMeta, JsonBody, parse_timestamp};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolSummary {
    pub name: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: Uuid,
    pub school_id: Uuid,
    pub title: String,
    pub description: String,
    pub city: String,
    pub country: String,
    pub location: String,
    pub salary: String,
    #[serde(rename = "type")]
    pub job_type: String,
    #[schema(value_type = String)]
    pub status: JobStatus,
    pub deadline: DateTime<Utc>,
    pub subjects_taught: Option<String>,
    pub student_age_group_min: Option<i32>,
    pub student_age_group_max: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub contract_length: Option<String>,
    pub teaching_hours_per_week: Option<String>,
    pub qualification: String,
    pub experience: String,
    pub language: String,
    pub visa_required: bool,
    pub teaching_license_required: bool,
    pub benefits: Option<String>,
    pub requirements: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<SchoolSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_count: Option<i64>,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        Self {
            location: j.location(),
            id: j.id,
            school_id: j.school_id,
            title: j.title,
            description: j.description,
            city: j.city,
            country: j.country,
            salary: j.salary,
            job_type: j.job_type,
            status: j.status,
            deadline: j.deadline,
            subjects_taught: j.subjects_taught,
            student_age_group_min: j.student_age_group_min,
            student_age_group_max: j.student_age_group_max,
            start_date: j.start_date,
            contract_length: j.contract_length,
            teaching_hours_per_week: j.teaching_hours_per_week,
            qualification: j.qualification,
            experience: j.experience,
            language: j.language,
            visa_required: j.visa_required,
            teaching_license_required: j.teaching_license_required,
            benefits: j.benefits,
            requirements: j.requirements,
            created_at: j.created_at,
            updated_at: j.updated_at,
            school: None,
            application_count: None,
        }
    }
}

impl From<JobListing> for JobResponse {
    fn from(l: JobListing) -> Self {
        let mut out = JobResponse::from(l.job);
        out.school = Some(SchoolSummary {
            name: l.school_name,
            logo_url: l.school_logo_url,
        });
        out.application_count = Some(l.application_count);
        out
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobEnvelope {
    pub job: JobResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobChangedResponse {
    pub message: String,
    pub job: JobResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobDeletedResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicJobsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub job_type: Option<String>,
    /// `closing_soon`, `8-30_days` or `rolling`
    pub deadline: Option<String>,
    /// `latest`, `oldest`, `deadline`, `salary_high` or `salary_low`
    pub sort: Option<String>,
}

impl PublicJobsQuery {
    fn into_board(self) -> BoardQuery {
        let defaults = BoardQuery::default();
        BoardQuery {
            deadline: DeadlineWindow::parse(self.deadline.as_deref()),
            sort: JobSort::parse(self.sort.as_deref()),
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
            search: self.search,
            country: self.country,
            city: self.city,
            job_type: self.job_type,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_jobs: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublicJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub city: String,
    pub country: String,
    pub salary: String,
    #[serde(rename = "type")]
    pub job_type: String,
    /// `DRAFT` keeps the posting private and skips the subscription gate.
    pub status: Option<String>,
    pub deadline: Option<String>,
    pub subjects_taught: Option<String>,
    pub student_age_group_min: Option<i32>,
    pub student_age_group_max: Option<i32>,
    pub start_date: Option<String>,
    pub contract_length: Option<String>,
    pub teaching_hours_per_week: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub language: Option<String>,
    pub visa_required: bool,
    pub teaching_license_required: bool,
    pub benefits: Option<String>,
    pub requirements: Option<String>,
}

fn optional_date(raw: Option<&str>, field: &str) -> AppResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("Invalid {field} date"))),
    }
}

impl CreateJobRequest {
    fn into_new_job(self) -> AppResult<NewJob> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(s) => Some(
                JobStatus::parse(s).ok_or_else(|| AppError::validation("Invalid job status"))?,
            ),
        };
        Ok(NewJob {
            deadline: optional_date(self.deadline.as_deref(), "deadline")?,
            start_date: optional_date(self.start_date.as_deref(), "start")?,
            title: self.title,
            description: self.description,
            city: self.city,
            country: self.country,
            salary: self.salary,
            job_type: self.job_type,
            status,
            subjects_taught: self.subjects_taught,
            student_age_group_min: self.student_age_group_min,
            student_age_group_max: self.student_age_group_max,
            contract_length: self.contract_length,
            teaching_hours_per_week: self.teaching_hours_per_week,
            qualification: self.qualification,
            experience: self.experience,
            language: self.language,
            visa_required: self.visa_required,
            teaching_license_required: self.teaching_license_required,
            benefits: self.benefits,
            requirements: self.requirements,
        })
    }
}

/// Only the fields present are changed.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<String>,
    pub subjects_taught: Option<String>,
    pub start_date: Option<String>,
    pub contract_length: Option<String>,
    pub teaching_hours_per_week: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub language: Option<String>,
    pub visa_required: Option<bool>,
    pub teaching_license_required: Option<bool>,
    pub benefits: Option<String>,
    pub requirements: Option<String>,
}

impl UpdateJobRequest {
    fn into_changes(self) -> AppResult<JobChanges> {
        let status = match self.status.as_deref() {
            None => None,
            Some(s) => Some(JobStatus::parse(s).ok_or_else(|| {
                AppError::validation("Invalid status. Must be DRAFT, ACTIVE, PAUSED, or CLOSED")
            })?),
        };
        let deadline = match self.deadline.as_deref() {
            None => None,
            Some(raw) => Some(
                optional_date(Some(raw), "deadline")?
                    .ok_or_else(|| AppError::validation("Invalid deadline date"))?,
            ),
        };
        Ok(JobChanges {
            deadline,
            start_date: optional_date(self.start_date.as_deref(), "start")?,
            status,
            title: self.title,
            description: self.description,
            city: self.city,
            country: self.country,
            salary: self.salary,
            job_type: self.job_type,
            subjects_taught: self.subjects_taught,
            contract_length: self.contract_length,
            teaching_hours_per_week: self.teaching_hours_per_week,
            qualification: self.qualification,
            experience: self.experience,
            language: self.language,
            visa_required: self.visa_required,
            teaching_license_required: self.teaching_license_required,
            benefits: self.benefits,
            requirements: self.requirements,
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateJobStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ApplicationStats {
    pub total: usize,
    pub new: usize,
    pub reviewing: usize,
    pub interview: usize,
    pub declined: usize,
    pub hired: usize,
}

impl ApplicationStats {
    fn tally(statuses: impl Iterator<Item = ApplicationStatus>) -> Self {
        let mut s = ApplicationStats::default();
        for status in statuses {
            s.total += 1;
            match status {
                ApplicationStatus::Applied => s.new += 1,
                ApplicationStatus::Reviewing => s.reviewing += 1,
                ApplicationStatus::Interview => s.interview += 1,
                ApplicationStatus::Declined => s.declined += 1,
                ApplicationStatus::Hired => s.hired += 1,
            }
        }
        s
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobApplicationsResponse {
    pub job: JobResponse,
    pub applications: Vec<ApplicationResponse>,
    pub stats: ApplicationStats,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/public", get(public_jobs))
        .route(
            "/jobs/:id",
            get(get_job)
                .put(update_job)
                .patch(update_job)
                .delete(delete_job),
        )
        .route("/jobs/:id/status", patch(update_job_status))
        .route("/jobs/:id/applications", get(job_applications))
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/jobs", tag = "Jobs", responses((status = 200, body = JobListResponse)))]
pub async fn list_jobs(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<JobListResponse>> {
    let jobs = ctx.job_repo();
    let profiles = ctx.profile_repo();
    let uc = ListJobs {
        jobs: jobs.as_ref(),
        profiles: profiles.as_ref(),
    };
    let listed = uc.execute(&actor, Utc::now()).await?;
    Ok(Json(JobListResponse {
        jobs: listed.into_iter().map(JobResponse::from).collect(),
    }))
}

#[utoipa::path(get, path = "/api/jobs/public", tag = "Jobs", params(PublicJobsQuery), security(()), responses(
    (status = 200, body = PublicJobsResponse)
))]
pub async fn public_jobs(
    State(ctx): State<AppContext>,
    Query(q): Query<PublicJobsQuery>,
) -> AppResult<Json<PublicJobsResponse>> {
    let jobs = ctx.job_repo();
    let uc = PublicJobs {
        jobs: jobs.as_ref(),
    };
    let query = q.into_board().normalized();
    let (page, limit) = (query.page, query.limit);
    let found = uc.execute(query, Utc::now()).await?;

    let total_pages = found.total.div_ceil(u64::from(limit));
    Ok(Json(PublicJobsResponse {
        jobs: found.listings.into_iter().map(JobResponse::from).collect(),
        pagination: Pagination {
            page,
            limit,
            total_jobs: found.total,
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        },
    }))
}

#[utoipa::path(get, path = "/api/jobs/{id}", tag = "Jobs", params(("id" = Uuid, Path, description = "Job ID")), responses(
    (status = 200, body = JobEnvelope),
    (status = 404, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn get_job(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JobEnvelope>> {
    let jobs = ctx.job_repo();
    let profiles = ctx.profile_repo();
    let uc = GetJob {
        jobs: jobs.as_ref(),
        profiles: profiles.as_ref(),
    };
    let listing = uc.execute(&actor, id).await?;
    Ok(Json(JobEnvelope {
        job: listing.into(),
    }))
}

#[utoipa::path(post, path = "/api/jobs", tag = "Jobs", request_body = CreateJobRequest, responses(
    (status = 201, body = JobChangedResponse),
    (status = 403, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn create_job(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    JsonBody(req): JsonBody<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<JobChangedResponse>)> {
    let profiles = ctx.profile_repo();
    let school = require_school(profiles.as_ref(), &actor, "Only schools can post jobs").await?;
    let jobs = ctx.job_repo();
    let uc = CreateJob {
        jobs: jobs.as_ref(),
        notifications: ctx.notifications(),
    };
    let job = uc.execute(&school, req.into_new_job()?, &meta).await?;
    Ok((
        StatusCode::CREATED,
        Json(JobChangedResponse {
            message: "Job created successfully".into(),
            job: job.into(),
        }),
    ))
}

#[utoipa::path(put, path = "/api/jobs/{id}", tag = "Jobs", params(("id" = Uuid, Path, description = "Job ID")),
    request_body = UpdateJobRequest,
    responses(
        (status = 200, body = JobChangedResponse),
        (status = 403, body = crate::presentation::http::error::ErrorBody),
        (status = 404, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn update_job(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateJobRequest>,
) -> AppResult<Json<JobChangedResponse>> {
    let profiles = ctx.profile_repo();
    let school =
        require_school(profiles.as_ref(), &actor, "Only schools can update job postings").await?;
    let changes = req.into_changes()?;
    let jobs = ctx.job_repo();
    let uc = UpdateJob {
        jobs: jobs.as_ref(),
        notifications: ctx.notifications(),
    };
    let job = uc.execute(&school, id, &changes, &meta).await?;
    Ok(Json(JobChangedResponse {
        message: "Job updated successfully".into(),
        job: job.into(),
    }))
}

#[utoipa::path(patch, path = "/api/jobs/{id}/status", tag = "Jobs", params(("id" = Uuid, Path, description = "Job ID")),
    request_body = UpdateJobStatusRequest,
    responses((status = 200, body = JobChangedResponse))
)]
pub async fn update_job_status(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateJobStatusRequest>,
) -> AppResult<Json<JobChangedResponse>> {
    let profiles = ctx.profile_repo();
    let school =
        require_school(profiles.as_ref(), &actor, "Only schools can update job status").await?;
    let jobs = ctx.job_repo();
    let applications = ctx.application_repo();
    let uc = UpdateJobStatus {
        jobs: jobs.as_ref(),
        applications: applications.as_ref(),
        notifications: ctx.notifications(),
    };
    let job = uc.execute(&school, id, &req.status, &meta).await?;
    Ok(Json(JobChangedResponse {
        message: format!("Job status updated to {}", job.status.as_str()),
        job: job.into(),
    }))
}

#[utoipa::path(delete, path = "/api/jobs/{id}", tag = "Jobs", params(("id" = Uuid, Path, description = "Job ID")), responses(
    (status = 200, body = JobDeletedResponse),
    (status = 400, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn delete_job(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JobDeletedResponse>> {
    let profiles = ctx.profile_repo();
    let school = require_school(profiles.as_ref(), &actor, "Only schools can delete jobs").await?;
    let jobs = ctx.job_repo();
    let uc = DeleteJob {
        jobs: jobs.as_ref(),
        notifications: ctx.notifications(),
    };
    uc.execute(&school, id, &meta).await?;
    Ok(Json(JobDeletedResponse {
        message: "Job deleted successfully".into(),
    }))
}

#[utoipa::path(get, path = "/api/jobs/{id}/applications", tag = "Jobs", params(("id" = Uuid, Path, description = "Job ID")), responses(
    (status = 200, body = JobApplicationsResponse)
))]
pub async fn job_applications(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JobApplicationsResponse>> {
    let profiles = ctx.profile_repo();
    let school =
        require_school(profiles.as_ref(), &actor, "Only schools can view job applications")
            .await?;
    let jobs = ctx.job_repo();
    let applications = ctx.application_repo();
    let job = require_owned_job(jobs.as_ref(), &school, id).await?;
    let uc = JobApplications {
        jobs: jobs.as_ref(),
        applications: applications.as_ref(),
    };
    let views = uc.execute(&school, id).await?;
    let stats = ApplicationStats::tally(views.iter().map(|v| v.application.status));
    Ok(Json(JobApplicationsResponse {
        job: job.into(),
        applications: views.into_iter().map(ApplicationResponse::from).collect(),
        stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Fixture;
    use crate::domain::accounts::user::UserType;
    use crate::presentation::http::test_util::{bearer_for, json_request, read_json};
    use axum::http::Method;
    use serde_json::json;
    use tower::ServiceExt;

    fn job_body(status: &str) -> serde_json::Value {
        json!({
            "title": "Physics Teacher",
            "description": "Grades 9-11",
            "city": "Astana",
            "country": "Kazakhstan",
            "salary": "$2500",
            "type": "FULL_TIME",
            "deadline": "2099-06-30",
            "status": status
        })
    }

    #[tokio::test]
    async fn school_creates_job() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let school = fx.add_school();
        let token = bearer_for(&ctx.cfg, school.user_id, UserType::School);
        let res = routes(ctx)
            .oneshot(json_request(Method::POST, "/jobs", Some(&token), &job_body("ACTIVE")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let v = read_json(res).await;
        assert_eq!(v["job"]["status"], "ACTIVE");
        assert_eq!(v["job"]["type"], "FULL_TIME");
        assert_eq!(v["job"]["location"], "Astana, Kazakhstan");
    }

    #[tokio::test]
    async fn teacher_cannot_post() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let teacher = fx.add_teacher();
        let token = bearer_for(&ctx.cfg, teacher.user_id, UserType::Teacher);
        let res = routes(ctx)
            .oneshot(json_request(Method::POST, "/jobs", Some(&token), &job_body("ACTIVE")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(read_json(res).await["error"], "Only schools can post jobs");
    }

    #[tokio::test]
    async fn bad_deadline_is_a_validation_error() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let school = fx.add_school();
        let token = bearer_for(&ctx.cfg, school.user_id, UserType::School);
        let mut body = job_body("ACTIVE");
        body["deadline"] = json!("soon");
        let res = routes(ctx)
            .oneshot(json_request(Method::POST, "/jobs", Some(&token), &body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(res).await["error"], "Invalid deadline date");
    }

    #[tokio::test]
    async fn public_listing_needs_no_token_and_paginates() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let school = fx.add_school();
        for _ in 0..3 {
            fx.add_job(&school, JobStatus::Active, 10);
        }
        fx.add_job(&school, JobStatus::Draft, 10);
        let res = routes(ctx)
            .oneshot(json_request(Method::GET, "/jobs/public?limit=2", None, &json!(null)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = read_json(res).await;
        assert_eq!(v["jobs"].as_array().unwrap().len(), 2);
        assert_eq!(v["pagination"]["totalJobs"], 3);
        assert_eq!(v["pagination"]["hasNext"], true);
    }

    #[tokio::test]
    async fn invalid_status_value_is_rejected() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let school = fx.add_school();
        let job = fx.add_job(&school, JobStatus::Active, 10);
        let token = bearer_for(&ctx.cfg, school.user_id, UserType::School);
        let res = routes(ctx.clone())
            .oneshot(json_request(
                Method::PATCH,
                &format!("/jobs/{}/status", job.id),
                Some(&token),
                &json!({"status": "ARCHIVED"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = routes(ctx)
            .oneshot(json_request(
                Method::PATCH,
                &format!("/jobs/{}/status", job.id),
                Some(&token),
                &json!({"status": "PAUSED"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(fx.store.job(job.id).unwrap().status, JobStatus::Paused);
    }

    #[tokio::test]
    async fn public_board_sorts_and_filters_by_query() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let school = fx.add_school();
        let cheap = fx.add_job(&school, JobStatus::Active, 5);
        let rich = fx.add_job(&school, JobStatus::Active, 45);
        fx.store.update_job(rich.id, |j| {
            j.salary = "$3,200/month".into();
            j.city = "Almaty".into();
        });
        let res = routes(ctx.clone())
            .oneshot(json_request(
                Method::GET,
                "/jobs/public?sort=salary_high",
                None,
                &json!(null),
            ))
            .await
            .unwrap();
        let v = read_json(res).await;
        assert_eq!(v["jobs"][0]["id"], json!(rich.id));
        assert_eq!(v["jobs"][1]["id"], json!(cheap.id));

        let res = routes(ctx.clone())
            .oneshot(json_request(
                Method::GET,
                "/jobs/public?deadline=closing_soon",
                None,
                &json!(null),
            ))
            .await
            .unwrap();
        let v = read_json(res).await;
        assert_eq!(v["pagination"]["totalJobs"], 1);
        assert_eq!(v["jobs"][0]["id"], json!(cheap.id));

        let res = routes(ctx)
            .oneshot(json_request(Method::GET, "/jobs/public?city=alma", None, &json!(null)))
            .await
            .unwrap();
        let v = read_json(res).await;
        assert_eq!(v["pagination"]["totalJobs"], 1);
        assert_eq!(v["jobs"][0]["city"], "Almaty");
    }

    #[tokio::test]
    async fn school_edits_own_job() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let school = fx.add_school();
        let job = fx.add_job(&school, JobStatus::Active, 10);
        let token = bearer_for(&ctx.cfg, school.user_id, UserType::School);
        let res = routes(ctx.clone())
            .oneshot(json_request(
                Method::PUT,
                &format!("/jobs/{}", job.id),
                Some(&token),
                &json!({"title": "Head of Science", "deadline": "2099-01-31", "visaRequired": true}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = read_json(res).await;
        assert_eq!(v["message"], "Job updated successfully");
        assert_eq!(v["job"]["title"], "Head of Science");
        assert_eq!(v["job"]["visaRequired"], true);
        assert_eq!(v["job"]["description"], "Teach grades 7-9");

        let res = routes(ctx)
            .oneshot(json_request(
                Method::PATCH,
                &format!("/jobs/{}", job.id),
                Some(&token),
                &json!({"status": "ARCHIVED"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(res).await["error"],
            "Invalid status. Must be DRAFT, ACTIVE, PAUSED, or CLOSED"
        );
    }

    #[tokio::test]
    async fn other_school_cannot_edit() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let owner = fx.add_school();
        let other = fx.add_school();
        let teacher = fx.add_teacher();
        let job = fx.add_job(&owner, JobStatus::Active, 10);
        let token = bearer_for(&ctx.cfg, other.user_id, UserType::School);
        let res = routes(ctx.clone())
            .oneshot(json_request(
                Method::PUT,
                &format!("/jobs/{}", job.id),
                Some(&token),
                &json!({"title": "Mine now"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let token = bearer_for(&ctx.cfg, teacher.user_id, UserType::Teacher);
        let res = routes(ctx)
            .oneshot(json_request(
                Method::PUT,
                &format!("/jobs/{}", job.id),
                Some(&token),
                &json!({"title": "Mine now"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(read_json(res).await["error"], "Only schools can update job postings");
        assert_eq!(fx.store.job(job.id).unwrap().title, "Math Teacher");
    }

    #[tokio::test]
    async fn unsupported_method_is_405() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let res = routes(ctx)
            .oneshot(json_request(Method::PUT, "/jobs/public", None, &json!(null)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn stats_tally_by_status() {
        let s = ApplicationStats::tally(
            [
                ApplicationStatus::Applied,
                ApplicationStatus::Applied,
                ApplicationStatus::Hired,
            ]
            .into_iter(),
        );
        assert_eq!((s.total, s.new, s.hired, s.declined), (3, 2, 1, 0));
    }
}
