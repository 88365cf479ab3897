// crates/backend-bin/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use userauth_lib::{AuthError, StoreError};

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(err) => match err {
                AuthError::MissingHeader
                | AuthError::MalformedHeader
                | AuthError::DecodeError
                | AuthError::MalformedCredentials
                | AuthError::UserNotFound
                | AuthError::InvalidPassword
                | AuthError::NoSessionCookie => StatusCode::UNAUTHORIZED,
                AuthError::UnknownSession | AuthError::InvalidResetToken => StatusCode::FORBIDDEN,
                AuthError::EmailAlreadyRegistered
                | AuthError::Store(StoreError::InvalidEmail(_)) => StatusCode::BAD_REQUEST,
                AuthError::Password(_) | AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(err) => err.error_code(),
            AppError::BadRequest(_) => "REQ_001",
            AppError::Forbidden => "AUTH_007",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(err) if err.is_rejection() => match self.status_code() {
                StatusCode::UNAUTHORIZED => "Unauthorized".to_string(),
                StatusCode::FORBIDDEN => "Forbidden".to_string(),
                _ => err.to_string(),
            },
            AppError::Auth(_) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            }
            AppError::BadRequest(_) => "Invalid request".to_string(),
            AppError::Forbidden => "Forbidden".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
