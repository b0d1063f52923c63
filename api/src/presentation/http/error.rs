use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::application::errors::AppError;
use crate::bootstrap::config::is_production_env;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<bool>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            retry: None,
        }
    }
}

pub fn status_of(err: &AppError) -> StatusCode {
    match err {
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn body_of(err: AppError, expose_internal: bool) -> ErrorBody {
    match err {
        AppError::Unauthorized(m) | AppError::Forbidden(m) | AppError::NotFound(m) => {
            ErrorBody::new(m)
        }
        AppError::Validation { message, details } => ErrorBody {
            error: message,
            details,
            retry: None,
        },
        AppError::Unavailable(source) => {
            warn!(error = ?source, "database_unavailable");
            ErrorBody {
                error: "Database connection error".into(),
                details: Some(Value::String(
                    "The database is temporarily unavailable. Please try again in a moment."
                        .into(),
                )),
                retry: Some(true),
            }
        }
        AppError::Internal(source) => {
            error!(error = ?source, "internal_error");
            ErrorBody {
                error: "Internal server error".into(),
                details: expose_internal.then(|| Value::String(format!("{source:#}"))),
                retry: None,
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        let body = body_of(self, !is_production_env());
        (status, Json(body)).into_response()
    }
}
