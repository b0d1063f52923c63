use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::job_repository::SavedJob;
use crate::application::use_cases::jobs::saved_jobs::{ListSavedJobs, SaveJob, UnsaveJob};
use crate::bootstrap::app_context::AppContext;
use crate::domain::applications::application::ApplicationStatus;
use crate::presentation::http::auth::AuthUser;
use crate::presentation::http::extract::{ClientMeta, JsonBody};
use crate::presentation::http::jobs::JobResponse;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedJobResponse {
    #[serde(flatten)]
    pub job: JobResponse,
    pub saved_at: DateTime<Utc>,
    pub has_applied: bool,
    #[schema(value_type = Option<String>)]
    pub application_status: Option<ApplicationStatus>,
    pub application_date: Option<DateTime<Utc>>,
}

impl From<SavedJob> for SavedJobResponse {
    fn from(s: SavedJob) -> Self {
        Self {
            job: s.listing.into(),
            saved_at: s.saved_at,
            has_applied: s.application.is_some(),
            application_status: s.application.map(|(status, _)| status),
            application_date: s.application.map(|(_, at)| at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedJobListResponse {
    pub saved_jobs: Vec<SavedJobResponse>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveJobRequest {
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedJobCreated {
    pub message: String,
    pub job_id: Uuid,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavedJobRemoved {
    pub message: String,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/teachers/saved-jobs", get(list_saved_jobs).post(save_job))
        .route("/teachers/saved-jobs/:job_id", delete(unsave_job))
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/teachers/saved-jobs", tag = "Jobs", responses(
    (status = 200, body = SavedJobListResponse),
    (status = 403, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn list_saved_jobs(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<SavedJobListResponse>> {
    let profiles = ctx.profile_repo();
    let jobs = ctx.job_repo();
    let uc = ListSavedJobs {
        profiles: profiles.as_ref(),
        jobs: jobs.as_ref(),
    };
    let saved = uc.execute(&actor).await?;
    Ok(Json(SavedJobListResponse {
        saved_jobs: saved.into_iter().map(SavedJobResponse::from).collect(),
    }))
}

#[utoipa::path(post, path = "/api/teachers/saved-jobs", tag = "Jobs", request_body = SaveJobRequest, responses(
    (status = 201, body = SavedJobCreated),
    (status = 400, body = crate::presentation::http::error::ErrorBody),
    (status = 404, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn save_job(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    JsonBody(req): JsonBody<SaveJobRequest>,
) -> AppResult<(StatusCode, Json<SavedJobCreated>)> {
    let job_id = req
        .job_id
        .ok_or_else(|| AppError::validation("Job ID is required"))?;
    let profiles = ctx.profile_repo();
    let jobs = ctx.job_repo();
    let uc = SaveJob {
        profiles: profiles.as_ref(),
        jobs: jobs.as_ref(),
        notifications: ctx.notifications(),
    };
    let (job, saved_at) = uc.execute(&actor, job_id, &meta).await?;
    Ok((
        StatusCode::CREATED,
        Json(SavedJobCreated {
            message: "Job saved successfully".into(),
            job_id: job.id,
            saved_at,
        }),
    ))
}

#[utoipa::path(delete, path = "/api/teachers/saved-jobs/{job_id}", tag = "Jobs",
    params(("job_id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, body = SavedJobRemoved),
        (status = 404, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn unsave_job(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<SavedJobRemoved>> {
    let profiles = ctx.profile_repo();
    let jobs = ctx.job_repo();
    let uc = UnsaveJob {
        profiles: profiles.as_ref(),
        jobs: jobs.as_ref(),
        notifications: ctx.notifications(),
    };
    uc.execute(&actor, job_id, &meta).await?;
    Ok(Json(SavedJobRemoved {
        message: "Job removed from saved jobs".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Fixture;
    use crate::domain::accounts::user::UserType;
    use crate::domain::jobs::job::JobStatus;
    use crate::presentation::http::test_util::{bearer_for, json_request, read_json};
    use axum::http::Method;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    #[tokio::test]
    async fn teacher_saves_lists_and_removes() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let school = fx.add_school();
        let teacher = fx.add_teacher();
        let job = fx.add_job(&school, JobStatus::Active, 10);
        let token = bearer_for(&ctx.cfg, teacher.user_id, UserType::Teacher);

        let res = routes(ctx.clone())
            .oneshot(json_request(
                Method::POST,
                "/teachers/saved-jobs",
                Some(&token),
                &json!({ "jobId": job.id }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(read_json(res).await["message"], "Job saved successfully");

        let res = routes(ctx.clone())
            .oneshot(json_request(Method::GET, "/teachers/saved-jobs", Some(&token), &Value::Null))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = read_json(res).await;
        assert_eq!(v["savedJobs"][0]["id"], json!(job.id));
        assert_eq!(v["savedJobs"][0]["title"], "Math Teacher");
        assert_eq!(v["savedJobs"][0]["hasApplied"], false);
        assert_eq!(v["savedJobs"][0]["applicationStatus"], Value::Null);

        let res = routes(ctx.clone())
            .oneshot(json_request(
                Method::DELETE,
                &format!("/teachers/saved-jobs/{}", job.id),
                Some(&token),
                &Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(read_json(res).await["message"], "Job removed from saved jobs");

        let res = routes(ctx)
            .oneshot(json_request(
                Method::DELETE,
                &format!("/teachers/saved-jobs/{}", job.id),
                Some(&token),
                &Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_job_id_is_rejected() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let teacher = fx.add_teacher();
        let token = bearer_for(&ctx.cfg, teacher.user_id, UserType::Teacher);
        let res = routes(ctx)
            .oneshot(json_request(Method::POST, "/teachers/saved-jobs", Some(&token), &json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(res).await["error"], "Job ID is required");
    }

    #[tokio::test]
    async fn schools_have_no_bookmarks() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let school = fx.add_school();
        let token = bearer_for(&ctx.cfg, school.user_id, UserType::School);
        let res = routes(ctx)
            .oneshot(json_request(Method::GET, "/teachers/saved-jobs", Some(&token), &Value::Null))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(read_json(res).await["error"], "Teacher access required");
    }
}
