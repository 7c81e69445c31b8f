//! API error types and the wire error format.
//!
//! Every error response carries a machine-readable code and a
//! human-readable message: `{"error": "...", "code": ..., "message": "..."}`.
//! Internal detail never leaks to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use infermesh_auth::AuthError;
use infermesh_registry::RegistryError;
use infermesh_scheduler::ScheduleError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field is missing or empty.
    #[error("{0}")]
    InvalidArgument(String),

    /// The referenced agent id is unknown.
    #[error("{0}")]
    NotFound(String),

    /// Scheduling found no agent; the client should retry later.
    #[error("{0}")]
    Unavailable(String),

    /// Signing failed or an invariant broke; not retriable by the client.
    #[error("{0}")]
    Internal(String),
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    code: u16,
    message: String,
}

impl ApiError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.code(),
            code: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::NotFound(format!("agent not found: {id}")),
            RegistryError::InvalidRegistration(reason) => Self::InvalidArgument(reason),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NoAgentsAvailable => {
                Self::Unavailable("no agents available for the requested model".to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        // Any signing-authority failure on the mint path is a coordinator
        // bug, not a client error.
        tracing::error!(error = %err, "Signing authority error");
        Self::Internal("token generation failed".to_string())
    }
}
