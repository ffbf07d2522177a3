//! Error types for Cinelog services
//!
//! Provides a single error enum for the catalogue with:
//! - Distinct variants for each failure mode
//! - HTTP status code mapping
//! - Structured error responses
//! - Machine-readable error codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidRating,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidToken,
    ExpiredToken,

    // Authorization errors (3xxx)
    Forbidden,
    AdminReview,

    // Resource errors (4xxx)
    MovieNotFound,
    ReviewNotFound,
    GenreNotFound,

    // Conflict errors (5xxx)
    AlreadyReviewed,
    Conflict,
    GenreInUse,
    WriteConflict,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidRating => 1003,

            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidToken => 2002,
            ErrorCode::ExpiredToken => 2003,

            ErrorCode::Forbidden => 3001,
            ErrorCode::AdminReview => 3002,

            ErrorCode::MovieNotFound => 4001,
            ErrorCode::ReviewNotFound => 4002,
            ErrorCode::GenreNotFound => 4003,

            ErrorCode::AlreadyReviewed => 5001,
            ErrorCode::Conflict => 5002,
            ErrorCode::GenreInUse => 5003,
            ErrorCode::WriteConflict => 5004,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Rating must be between 1 and 5, got {value}")]
    InvalidRating { value: i64 },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Admins are not allowed to submit reviews")]
    AdminReview,

    // Resource errors
    #[error("Movie not found: {id}")]
    MovieNotFound { id: Uuid },

    #[error("Review {review_id} not found on movie {movie_id}")]
    ReviewNotFound { movie_id: Uuid, review_id: Uuid },

    #[error("Genre not found: {id}")]
    GenreNotFound { id: Uuid },

    // Conflict errors
    #[error("You have already reviewed movie {movie_id}")]
    AlreadyReviewed { movie_id: Uuid },

    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    #[error("Genre {id} is still referenced by {movies} movie(s)")]
    GenreInUse { id: Uuid, movies: u64 },

    #[error("Movie {id} was modified concurrently, retry the request")]
    WriteConflict { id: Uuid },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidRating { .. } => ErrorCode::InvalidRating,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::AdminReview => ErrorCode::AdminReview,
            AppError::MovieNotFound { .. } => ErrorCode::MovieNotFound,
            AppError::ReviewNotFound { .. } => ErrorCode::ReviewNotFound,
            AppError::GenreNotFound { .. } => ErrorCode::GenreNotFound,
            AppError::AlreadyReviewed { .. } => ErrorCode::AlreadyReviewed,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::GenreInUse { .. } => ErrorCode::GenreInUse,
            AppError::WriteConflict { .. } => ErrorCode::WriteConflict,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request. A duplicate review is reported as a bad
            // request, matching what clients of the catalogue expect.
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidRating { .. }
            | AppError::AlreadyReviewed { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } | AppError::InvalidToken | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            AppError::Forbidden { .. } | AppError::AdminReview => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::MovieNotFound { .. }
            | AppError::ReviewNotFound { .. }
            | AppError::GenreNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Duplicate { .. }
            | AppError::GenreInUse { .. }
            | AppError::WriteConflict { .. } => StatusCode::CONFLICT,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Whether the error is a lost compare-and-swap that may succeed on retry
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, AppError::WriteConflict { .. })
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match self {
            AppError::Validation { field, .. } => field,
            AppError::MissingField { field } => Some(field),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Missing required fields are reported as such so clients can
        // highlight the exact input.
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        for (field, errs) in &fields {
            if errs.iter().any(|e| e.code == "required") {
                return AppError::MissingField {
                    field: field.to_string(),
                };
            }
        }

        AppError::Validation {
            message: errors.to_string(),
            field: fields.first().map(|(field, _)| field.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseConnection {
            message: format!("Migration failed: {}", err),
        }
    }
}
