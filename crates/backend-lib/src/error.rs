// crates/backend-lib/src/error.rs

//! Error types for the store and the authentication layers.
use crate::auth::password::PasswordError;
use thiserror::Error;

/// Failures of the user store and its persistence backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Could not replace the user file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Email already held by another user: {0}")]
    DuplicateEmail(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

/// Rejection reasons surfaced to the request handler
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Authorization header does not use the Basic scheme")]
    MalformedHeader,

    #[error("Credentials are not valid base64")]
    DecodeError,

    #[error("Credentials must be a single email:password pair")]
    MalformedCredentials,

    #[error("No user found for this email")]
    UserNotFound,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("No session cookie")]
    NoSessionCookie,

    #[error("Unknown session")]
    UnknownSession,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid reset token")]
    InvalidResetToken,

    #[error("Password hashing error: {0}")]
    Password(#[from] PasswordError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Stable code for this error, used in response bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "AUTH_001",
            AuthError::MalformedHeader => "AUTH_002",
            AuthError::DecodeError => "AUTH_003",
            AuthError::MalformedCredentials => "AUTH_004",
            AuthError::UserNotFound => "AUTH_005",
            AuthError::InvalidPassword => "AUTH_006",
            AuthError::NoSessionCookie => "SESS_001",
            AuthError::UnknownSession => "SESS_002",
            AuthError::EmailAlreadyRegistered => "USER_001",
            AuthError::InvalidResetToken => "USER_002",
            AuthError::Password(_) => "INT_001",
            AuthError::Store(StoreError::InvalidEmail(_)) => "VAL_001",
            AuthError::Store(_) => "IO_001",
        }
    }

    /// True for failures caused by the request rather than the server
    pub fn is_rejection(&self) -> bool {
        match self {
            AuthError::Password(_) => false,
            AuthError::Store(StoreError::InvalidEmail(_)) => true,
            AuthError::Store(_) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_auth_error_display() {
        assert_eq!(AuthError::UnknownSession.to_string(), "Unknown session");
        assert_eq!(AuthError::InvalidPassword.to_string(), "Invalid password");

        let err = AuthError::from(StoreError::DuplicateEmail("a@b.io".to_string()));
        assert!(err.to_string().contains("a@b.io"));
    }

    #[test]
    fn test_error_codes_and_rejections() {
        assert_eq!(AuthError::DecodeError.error_code(), "AUTH_003");
        assert_eq!(AuthError::NoSessionCookie.error_code(), "SESS_001");
        assert!(AuthError::MalformedCredentials.is_rejection());

        let io = AuthError::from(StoreError::from(IoError::new(
            ErrorKind::PermissionDenied,
            "denied",
        )));
        assert_eq!(io.error_code(), "IO_001");
        assert!(!io.is_rejection());

        let invalid = AuthError::from(StoreError::InvalidEmail("nope".to_string()));
        assert_eq!(invalid.error_code(), "VAL_001");
        assert!(invalid.is_rejection());
    }
}
