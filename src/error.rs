use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::policy::error::{Denial, LifecycleError};
use crate::store::StoreError;

/// Errors a handler can return; each maps to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal => "internal",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        ApiError::Forbidden(denial.to_string())
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::Validation(v) => ApiError::BadRequest(v.to_string()),
            LifecycleError::Authorization(d) => d.into(),
            e @ (LifecycleError::InvalidTransition { .. }
            | LifecycleError::Closed { .. }
            | LifecycleError::Conflict { .. }) => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, .. } => ApiError::NotFound(entity),
            StoreError::Conflict {
                id,
                expected,
                found,
            } => LifecycleError::Conflict {
                id,
                expected,
                found,
            }
            .into(),
            StoreError::SessionEnded(_) => ApiError::Unauthorized("Session expired or signed out"),
            StoreError::Duplicate(what) => ApiError::Conflict(format!("{} already exists", what)),
            StoreError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                ApiError::Internal
            }
            StoreError::Corrupt(what) => {
                tracing::error!(record = %what, "Corrupt record");
                ApiError::Internal
            }
        }
    }
}
