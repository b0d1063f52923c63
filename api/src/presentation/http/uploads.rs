use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::post,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::errors::{AppError, AppResult};
use crate::application::use_cases::uploads::upload_profile_file::UploadProfileFile;
use crate::bootstrap::app_context::AppContext;
use crate::presentation::http::auth::AuthUser;
use crate::presentation::http::extract::{ClientMeta, read_form};

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadMultipart {
    /// Teachers: resume, photo, portfolio, certificate. Schools: logo, coverPhoto, photo, certificate.
    r#type: String,
    #[schema(value_type = String, format = Binary)]
    file: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub file_url: String,
    /// Storage key of the blob.
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub original_name: String,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/upload", post(upload_file))
        .with_state(ctx)
}

#[utoipa::path(post, path = "/api/upload", tag = "Uploads",
    request_body(content = UploadMultipart, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = UploadResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody),
        (status = 404, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn upload_file(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut form = read_form(
        multipart,
        ctx.upload_limit(),
        ctx.cfg.upload_tmp_dir.as_deref(),
    )
    .await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::validation("No file uploaded"))?;
    let Some(kind) = form.text("type") else {
        file.discard();
        return Err(AppError::validation("File type is required"));
    };

    let profiles = ctx.profile_repo();
    let blobs = ctx.blob_storage();
    let uc = UploadProfileFile {
        profiles: profiles.as_ref(),
        blobs: blobs.as_ref(),
        notifications: ctx.notifications(),
        max_upload_bytes: ctx.upload_limit(),
    };
    let uploaded = uc.execute(&actor, &kind, file, &meta, Utc::now()).await?;
    Ok(Json(UploadResponse {
        message: "File uploaded successfully".into(),
        file_url: uploaded.url,
        filename: uploaded.key,
        kind: uploaded.kind.as_str().to_string(),
        size: uploaded.size,
        original_name: uploaded.original_name,
    }))
}
