//! HTTP error mapping.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::{ErrorDetail, ErrorResponse};
use crate::error::Error;

/// API error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    TooManyRequests(String),

    /// Extractor rejection, keeps the status axum chose.
    #[error("{1}")]
    Rejected(StatusCode, String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Rejected(status, _) => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::TooManyRequests(_) => "too_many_requests",
            ApiError::Rejected(..) => "invalid_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            errors: vec![ErrorDetail {
                message: self.to_string(),
                code: Some(self.code().to_string()),
            }],
            trace: None,
            status_code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let message = e.to_string();
        match e {
            Error::UnknownDevice(_)
            | Error::UnsupportedProgram(_)
            | Error::SessionNotFound(_)
            | Error::DeviceMismatch { .. }
            | Error::InvalidMode(_)
            | Error::JobNotCompleted { .. } => ApiError::BadRequest(message),
            Error::JobNotFound(_) => ApiError::NotFound(message),
            Error::SessionClosed(_) => ApiError::Conflict(message),
            Error::Saturated { .. } => ApiError::TooManyRequests(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::UnknownDevice("ghost".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidMode("x".into()), StatusCode::BAD_REQUEST),
            (Error::JobNotFound("j".into()), StatusCode::NOT_FOUND),
            (Error::SessionClosed("s".into()), StatusCode::CONFLICT),
            (Error::Saturated { limit: 1 }, StatusCode::TOO_MANY_REQUESTS),
            (
                Error::DeviceMismatch {
                    session_id: "s".into(),
                    session_device: "fake_lima".into(),
                    requested: "fake_manila".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }

    #[test]
    fn test_message_preserved() {
        let api: ApiError = Error::UnknownDevice("ghost".into()).into();
        assert_eq!(api.to_string(), "Backend not found: ghost");
    }
}
