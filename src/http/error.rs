//! Mapping of service errors onto HTTP responses.
//!
//! Non-transient storage failures are logged in full and answered with a
//! generic message so that SQL or connection details never reach callers.

use crate::marketplace::{
    domain::ValidationError,
    services::{ErrorKind, MarketplaceError},
};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Error returned by every HTTP handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A marketplace service rejected the request.
    #[error(transparent)]
    Service(#[from] MarketplaceError),

    /// The request could not be decoded.
    #[error("malformed request: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Returns the error classification reported to the caller.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Service(err) => err.kind(),
            Self::Malformed(_) => ErrorKind::Validation,
        }
    }

    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::TransientStorage | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Service(MarketplaceError::Validation(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::TransientStorage => {
                warn!(error = %self, "transient storage failure");
                "storage temporarily unavailable, retry the request".to_owned()
            }
            ErrorKind::Storage => {
                error!(error = %self, "storage failure");
                "internal storage error".to_owned()
            }
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Conflict => self.to_string(),
        };
        let body = json!({
            "error": message,
            "kind": kind.as_str(),
            "retryable": kind == ErrorKind::TransientStorage,
        });
        (self.status(), Json(body)).into_response()
    }
}
