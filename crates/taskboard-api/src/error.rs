use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::response::Envelope;

/// Any failure a handler can return, rendered as an envelope.
#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", detail);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Envelope::<()> {
            data: None,
            error: Some(self.message),
            status: self.status.as_u16(),
        }
        .into_response_with(self.status)
    }
}

impl From<taskboard_core::Error> for ApiError {
    fn from(err: taskboard_core::Error) -> Self {
        use taskboard_core::Error;

        match err {
            Error::NotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            Error::Forbidden(_) => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            Error::Unauthorized(_) => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            Error::Validation(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            Error::Conflict(_) => Self::new(StatusCode::CONFLICT, err.to_string()),
            Error::Storage(_) | Error::Other(_) => Self::internal(err),
        }
    }
}

impl From<taskboard_auth::Error> for ApiError {
    fn from(err: taskboard_auth::Error) -> Self {
        use taskboard_auth::Error;

        match err {
            Error::InvalidCredentials | Error::InvalidToken(_) => {
                Self::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            Error::WeakPassword(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            Error::Core(core) => core.into(),
            Error::Hashing(_) | Error::Other(_) => Self::internal(err),
        }
    }
}

/// Bad syntax, a missing content type and a body of the wrong shape all
/// answer 400.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_statuses() {
        let cases = [
            (taskboard_core::Error::NotFound("Section".into()), StatusCode::NOT_FOUND),
            (taskboard_core::Error::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (taskboard_core::Error::Validation("x".into()), StatusCode::BAD_REQUEST),
            (taskboard_core::Error::Conflict("x".into()), StatusCode::CONFLICT),
            (taskboard_core::Error::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_storage_detail_is_hidden() {
        let err = ApiError::from(taskboard_core::Error::Storage("password=hunter2".into()));
        assert_eq!(err.message, "internal server error");
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        let err = ApiError::from(taskboard_auth::Error::InvalidCredentials);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "Invalid email or password");
    }
}
