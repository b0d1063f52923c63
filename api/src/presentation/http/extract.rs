use std::collections::HashMap;
use std::convert::Infallible;

use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Request};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::application::errors::{AppError, AppResult};
use crate::application::services::uploads::StagedFile;
use crate::domain::activity::RequestMeta;

/// Caller address and agent for audit entries.
pub struct ClientMeta(pub RequestMeta);

pub fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    RequestMeta {
        ip_address: header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| header("x-real-ip").map(str::to_string)),
        user_agent: header("user-agent").map(str::to_string),
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientMeta(request_meta(&parts.headers)))
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `Json` whose rejection is reported through the usual error body.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::validation(rejection.body_text())),
        }
    }
}

/// Text fields and spooled files of a multipart body.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, StagedFile>,
}

impl FormData {
    /// Trimmed value of a text field; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.text(name)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }
}

/// Reads every part of `multipart`, writing file parts to temporary files.
/// Bytes past `limit` are counted but not written; the recorded size still
/// reflects the full part so the caller can reject it.
pub async fn read_form(
    mut multipart: Multipart,
    limit: u64,
    tmp_dir: Option<&str>,
) -> AppResult<FormData> {
    let mut form = FormData::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if field.file_name().is_some() {
            let staged = stage_field(field, limit, tmp_dir).await?;
            // An empty file input still sends a nameless, empty part.
            if staged.size == 0 && staged.original_name.as_deref().unwrap_or("").is_empty() {
                staged.discard();
                continue;
            }
            form.files.insert(name, staged);
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            form.fields.insert(name, text);
        }
    }
    Ok(form)
}

async fn stage_field(
    mut field: Field<'_>,
    limit: u64,
    tmp_dir: Option<&str>,
) -> AppResult<StagedFile> {
    let original_name = field.file_name().map(str::to_string);
    let content_type = field
        .content_type()
        .map(str::to_string)
        .or_else(|| {
            original_name
                .as_deref()
                .map(|n| mime_guess::from_path(n).first_or_octet_stream().essence_str().to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let temp = match tmp_dir {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .map_err(|e| AppError::Internal(e.into()))?;
    let (file, path) = temp.into_parts();
    let mut out = tokio::fs::File::from_std(file);

    let mut size: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        size += chunk.len() as u64;
        if size <= limit {
            out.write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(e.into()))?;
        }
    }
    out.flush().await.map_err(|e| AppError::Internal(e.into()))?;

    Ok(StagedFile::new(path, original_name, content_type, size))
}
