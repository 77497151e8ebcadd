//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every handler returns `Result<_, AppError>`, so a failure anywhere in a request ends
//! up as a terminal HTTP response with a short JSON body of the form `{"error": "..."}`.
//!
//! `AppError` implements `actix_web::error::ResponseError` to convert application errors
//! into HTTP responses. It also provides `From` implementations for `sqlx::Error`,
//! `sqlx::migrate::MigrateError`, `validator::ValidationErrors` and
//! `actix_web::error::BlockingError`, allowing for easy conversion using `?`.

use actix_web::{error::BlockingError, error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// No session, or the session is invalid or expired (HTTP 401).
    Unauthorized(String),
    /// Sign-in with an unknown username or a wrong password (HTTP 401).
    InvalidCredentials,
    /// Sign-up with a username that already has a key (HTTP 400).
    DuplicateUser,
    /// Malformed or otherwise unacceptable request (HTTP 400).
    BadRequest(String),
    /// The requested resource does not exist for this user (HTTP 404).
    NotFound(String),
    /// Unexpected server-side failure (HTTP 500).
    InternalServerError(String),
    /// Failure reported by the database (HTTP 500).
    DatabaseError(String),
    /// Field constraints failed on an inbound body (HTTP 422).
    ValidationError(String),
}

impl AppError {
    fn message(&self) -> String {
        match self {
            AppError::InvalidCredentials => "Invalid username or password".to_string(),
            AppError::DuplicateUser => "Duplicate Username".to_string(),
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg)
            | AppError::DatabaseError(msg)
            | AppError::ValidationError(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::InvalidCredentials => write!(f, "Unauthorized: invalid credentials"),
            AppError::DuplicateUser => write!(f, "Bad Request: duplicate username"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::DuplicateUser | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
            // Database errors are presented as generic internal server errors to the client.
            return HttpResponse::build(status).json(json!({
                "error": "Internal Server Error"
            }));
        }
        HttpResponse::build(status).json(json!({
            "error": self.message()
        }))
    }
}

/// `sqlx::Error::RowNotFound` maps to `AppError::NotFound`; everything else is a
/// `DatabaseError`. Constraint violations that carry domain meaning are mapped by the
/// caller before reaching this conversion.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> AppError {
        AppError::DatabaseError(format!("Migration failed: {}", error))
    }
}

/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Raised when the blocking thread pool used for password hashing is gone.
impl From<BlockingError> for AppError {
    fn from(error: BlockingError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}
