use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::errors::AppResult;
use crate::application::use_cases::profiles::school_profile::{
    GetSchoolProfile, UpdateSchoolProfile,
};
use crate::application::use_cases::profiles::teacher_profile::{
    GetTeacherProfile, UpdateTeacherProfile,
};
use crate::bootstrap::app_context::AppContext;
use crate::domain::accounts::user::{
    SchoolProfile, SchoolProfileEdit, TeacherProfile, TeacherProfileEdit,
};
use crate::presentation::http::auth::AuthUser;
use crate::presentation::http::extract::{ClientMeta, JsonBody};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherProfileResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
    pub subjects: Vec<String>,
    pub certifications: Vec<String>,
    pub languages: Vec<String>,
    pub availability: Option<String>,
    pub resume_url: Option<String>,
    pub photo_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub profile_complete: bool,
    pub last_active: Option<DateTime<Utc>>,
}

impl From<TeacherProfile> for TeacherProfileResponse {
    fn from(t: TeacherProfile) -> Self {
        Self {
            id: t.id,
            user_id: t.user_id,
            email: t.email,
            first_name: t.first_name,
            last_name: t.last_name,
            phone: t.phone,
            city: t.city,
            country: t.country,
            qualification: t.qualification,
            experience: t.experience,
            experience_years: t.experience_years,
            bio: t.bio,
            subjects: t.subjects,
            certifications: t.certifications,
            languages: t.languages,
            availability: t.availability,
            resume_url: t.resume_url,
            photo_url: t.photo_url,
            portfolio_url: t.portfolio_url,
            profile_complete: t.profile_complete,
            last_active: t.last_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherProfileEnvelope {
    pub teacher: TeacherProfileResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherProfileUpdated {
    pub message: String,
    pub teacher: TeacherProfileResponse,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateTeacherProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
    pub subjects: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub availability: Option<String>,
}

impl From<UpdateTeacherProfileRequest> for TeacherProfileEdit {
    fn from(r: UpdateTeacherProfileRequest) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
            city: r.city,
            country: r.country,
            qualification: r.qualification,
            experience: r.experience,
            experience_years: r.experience_years,
            bio: r.bio,
            subjects: r.subjects,
            certifications: r.certifications,
            languages: r.languages,
            availability: r.availability,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolProfileResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub telephone: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub school_type: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub established: Option<i32>,
    pub student_count: Option<i32>,
    pub logo_url: Option<String>,
    pub cover_photo_url: Option<String>,
    pub photo_url: Option<String>,
    pub subscription_status: String,
    /// Name, contact, city and country are all filled in.
    pub profile_complete: bool,
    pub completion_percentage: u8,
}

impl From<SchoolProfile> for SchoolProfileResponse {
    fn from(s: SchoolProfile) -> Self {
        Self {
            profile_complete: s.missing_posting_fields().is_empty(),
            completion_percentage: s.completion_percentage(),
            subscription_status: s.subscription.status.as_str().to_string(),
            id: s.id,
            user_id: s.user_id,
            email: s.email,
            name: s.name,
            contact_name: s.contact_name,
            contact_email: s.contact_email,
            telephone: s.telephone,
            street_address: s.street_address,
            city: s.city,
            country: s.country,
            school_type: s.school_type,
            website: s.website,
            description: s.description,
            established: s.established,
            student_count: s.student_count,
            logo_url: s.logo_url,
            cover_photo_url: s.cover_photo_url,
            photo_url: s.photo_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SchoolProfileEnvelope {
    pub school: SchoolProfileResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SchoolProfileUpdated {
    pub message: String,
    pub school: SchoolProfileResponse,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateSchoolProfileRequest {
    pub name: String,
    pub contact_name: String,
    pub city: String,
    pub country: String,
    pub contact_email: Option<String>,
    pub telephone: Option<String>,
    pub street_address: Option<String>,
    pub school_type: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    /// Year the school opened.
    pub established: Option<i32>,
    pub student_count: Option<i32>,
}

impl From<UpdateSchoolProfileRequest> for SchoolProfileEdit {
    fn from(r: UpdateSchoolProfileRequest) -> Self {
        Self {
            name: r.name,
            contact_name: r.contact_name,
            city: r.city,
            country: r.country,
            contact_email: r.contact_email,
            telephone: r.telephone,
            street_address: r.street_address,
            school_type: r.school_type,
            website: r.website,
            description: r.description,
            established: r.established,
            student_count: r.student_count,
        }
    }
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route(
            "/teachers/profile",
            get(get_teacher_profile).put(update_teacher_profile),
        )
        .route(
            "/schools/profile",
            get(get_school_profile).put(update_school_profile),
        )
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/teachers/profile", tag = "Profiles", responses(
    (status = 200, body = TeacherProfileEnvelope),
    (status = 403, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn get_teacher_profile(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<TeacherProfileEnvelope>> {
    let profiles = ctx.profile_repo();
    let uc = GetTeacherProfile {
        profiles: profiles.as_ref(),
    };
    let teacher = uc.execute(&actor, Utc::now()).await?;
    Ok(Json(TeacherProfileEnvelope {
        teacher: teacher.into(),
    }))
}

#[utoipa::path(put, path = "/api/teachers/profile", tag = "Profiles",
    request_body = UpdateTeacherProfileRequest,
    responses(
        (status = 200, body = TeacherProfileUpdated),
        (status = 400, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn update_teacher_profile(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    JsonBody(req): JsonBody<UpdateTeacherProfileRequest>,
) -> AppResult<Json<TeacherProfileUpdated>> {
    let profiles = ctx.profile_repo();
    let uc = UpdateTeacherProfile {
        profiles: profiles.as_ref(),
        notifications: ctx.notifications(),
    };
    let teacher = uc.execute(&actor, &req.into(), &meta).await?;
    Ok(Json(TeacherProfileUpdated {
        message: "Profile updated successfully".into(),
        teacher: teacher.into(),
    }))
}

#[utoipa::path(get, path = "/api/schools/profile", tag = "Profiles", responses(
    (status = 200, body = SchoolProfileEnvelope),
    (status = 403, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn get_school_profile(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<SchoolProfileEnvelope>> {
    let profiles = ctx.profile_repo();
    let uc = GetSchoolProfile {
        profiles: profiles.as_ref(),
    };
    let school = uc.execute(&actor).await?;
    Ok(Json(SchoolProfileEnvelope {
        school: school.into(),
    }))
}

#[utoipa::path(put, path = "/api/schools/profile", tag = "Profiles",
    request_body = UpdateSchoolProfileRequest,
    responses(
        (status = 200, body = SchoolProfileUpdated),
        (status = 400, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn update_school_profile(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    JsonBody(req): JsonBody<UpdateSchoolProfileRequest>,
) -> AppResult<Json<SchoolProfileUpdated>> {
    let profiles = ctx.profile_repo();
    let uc = UpdateSchoolProfile {
        profiles: profiles.as_ref(),
        notifications: ctx.notifications(),
    };
    let school = uc.execute(&actor, &req.into(), &meta).await?;
    Ok(Json(SchoolProfileUpdated {
        message: "Profile updated successfully".into(),
        school: school.into(),
    }))
}
