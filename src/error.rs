use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum TuitionServerError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session not found or expired")]
    InvalidSession,

    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] mongodb::bson::oid::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl ResponseError for TuitionServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            TuitionServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            TuitionServerError::InvalidSession => StatusCode::UNAUTHORIZED,
            TuitionServerError::InvalidId(_) => StatusCode::BAD_REQUEST,
            TuitionServerError::NotFound(_) => StatusCode::NOT_FOUND,
            TuitionServerError::Validation(_) => StatusCode::BAD_REQUEST,
            TuitionServerError::Duplicate(_) => StatusCode::CONFLICT,
            TuitionServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TuitionServerError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TuitionServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TuitionServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_response = ErrorResponse {
            success: false,
            error: self.to_string(),
        };

        HttpResponse::build(status).json(error_response)
    }
}

pub type Result<T> = std::result::Result<T, TuitionServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TuitionServerError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TuitionServerError::NotFound("Student".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TuitionServerError::Validation("name is required".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TuitionServerError::Duplicate("student already exists".to_string()).status_code(),
            StatusCode::CONFLICT
        );
    }
}
