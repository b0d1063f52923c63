use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Error of a use case. Carries the user-facing reason; presentation decides the status code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("Database connection error")]
    Unavailable(#[source] anyhow::Error),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            details: None,
        }
    }

    pub fn validation_with(msg: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: msg.into(),
            details: Some(details),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Unauthorized(_) | AppError::Forbidden(_) => ErrorCategory::Auth,
            AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::Validation { .. } => ErrorCategory::Validation,
            AppError::Unavailable(_) => ErrorCategory::TransientInfra,
            AppError::Internal(_) => ErrorCategory::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    TransientInfra,
    Validation,
    Auth,
    NotFound,
    Unknown,
}

/// Context attached by the database executor once a transient failure has used up
/// its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unavailable;

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("database temporarily unavailable")
    }
}

const TRANSIENT_PATTERNS: &[&str] = &[
    "engine was empty",
    "engine is not yet connected",
    "not yet connected",
    "connection refused",
    "connection reset",
    "connection closed",
    "broken pipe",
    "timed out",
    "pool timed out",
];

/// Single place that decides what kind of failure an opaque error is.
pub fn classify(err: &anyhow::Error) -> ErrorCategory {
    if err.downcast_ref::<Unavailable>().is_some() {
        return ErrorCategory::TransientInfra;
    }
    if let Some(app) = err.downcast_ref::<AppError>() {
        return app.category();
    }
    let transient = err.chain().any(|cause| {
        let text = cause.to_string().to_ascii_lowercase();
        TRANSIENT_PATTERNS.iter().any(|p| text.contains(p))
    });
    if transient {
        ErrorCategory::TransientInfra
    } else {
        ErrorCategory::Unknown
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match classify(&err) {
            ErrorCategory::TransientInfra => AppError::Unavailable(err),
            ErrorCategory::Unknown => AppError::Internal(err),
            _ => match err.downcast::<AppError>() {
                Ok(app) => app,
                Err(err) => AppError::Internal(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn exhausted_retries_are_transient() {
        let err = anyhow!("server closed the connection unexpectedly").context(Unavailable);
        assert_eq!(classify(&err), ErrorCategory::TransientInfra);
        assert!(matches!(AppError::from(err), AppError::Unavailable(_)));
    }

    #[test]
    fn message_patterns_are_transient() {
        let err = anyhow!("Engine is not yet connected");
        assert_eq!(classify(&err), ErrorCategory::TransientInfra);
        let nested = anyhow!("connection refused (os error 111)").context("loading job");
        assert_eq!(classify(&nested), ErrorCategory::TransientInfra);
    }

    #[test]
    fn wrapped_app_errors_keep_their_category() {
        let err = anyhow::Error::new(AppError::not_found("Job not found"));
        assert_eq!(classify(&err), ErrorCategory::NotFound);
        match AppError::from(err) {
            AppError::NotFound(msg) => assert_eq!(msg, "Job not found"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn everything_else_is_unknown() {
        let err = anyhow!("column \"foo\" does not exist");
        assert_eq!(classify(&err), ErrorCategory::Unknown);
        assert!(matches!(AppError::from(err), AppError::Internal(_)));
    }
}
