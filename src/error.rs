use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// LmsError
///
/// The error taxonomy every engine operation and handler returns. Each variant maps to
/// exactly one HTTP status; the rendered body is an [`ErrorBody`].
#[derive(Debug, Error)]
pub enum LmsError {
    /// Missing, malformed, expired or unknown credential.
    #[error("authentication required")]
    Unauthenticated,
    /// Authenticated, but not the teacher / not enrolled / not the comment author.
    #[error("{0}")]
    Forbidden(String),
    /// The referenced resource does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    /// Request payload failed validation.
    #[error("{0}")]
    Invalid(String),
    /// Persistence or storage failure. The message is logged, not sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorBody
///
/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    /// Stable machine-readable code, e.g. `forbidden`.
    pub code: String,
}

impl LmsError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        LmsError::Forbidden(reason.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        LmsError::Invalid(reason.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LmsError::Unauthenticated => StatusCode::UNAUTHORIZED,
            LmsError::Forbidden(_) => StatusCode::FORBIDDEN,
            LmsError::NotFound(_) => StatusCode::NOT_FOUND,
            LmsError::Conflict(_) => StatusCode::CONFLICT,
            LmsError::Invalid(_) => StatusCode::BAD_REQUEST,
            LmsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LmsError::Unauthenticated => "unauthenticated",
            LmsError::Forbidden(_) => "forbidden",
            LmsError::NotFound(_) => "not_found",
            LmsError::Conflict(_) => "conflict",
            LmsError::Invalid(_) => "invalid",
            LmsError::Internal(_) => "internal",
        }
    }
}

impl From<RepositoryError> for LmsError {
    fn from(err: RepositoryError) -> Self {
        match err {
            duplicate @ RepositoryError::Duplicate(_) => LmsError::Conflict(duplicate.to_string()),
            other => LmsError::Internal(other.to_string()),
        }
    }
}

// Decoding failures of the `extract` wrappers. The rejection's own text names the
// offending field or segment.

impl From<JsonRejection> for LmsError {
    fn from(rejection: JsonRejection) -> Self {
        LmsError::Invalid(rejection.body_text())
    }
}

impl From<PathRejection> for LmsError {
    fn from(rejection: PathRejection) -> Self {
        LmsError::Invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for LmsError {
    fn from(rejection: QueryRejection) -> Self {
        LmsError::Invalid(rejection.body_text())
    }
}

impl IntoResponse for LmsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            LmsError::Internal(detail) => {
                tracing::error!("request failed: {}", detail);
                "internal server error".to_string()
            }
            other => {
                tracing::debug!(code = other.code(), "request rejected: {}", other);
                other.to_string()
            }
        };

        let body = ErrorBody {
            error: message,
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
