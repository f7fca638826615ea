//! Error types for the Shelfmark server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not unique: {0}")]
    NotUnique(String),

    #[error("Can't be deleted: {0}")]
    CantBeDeleted(String),

    #[error("Book can't be borrowed: {0}")]
    CantBeBorrowed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Collapse store-level race outcomes into typed business errors.
    ///
    /// Postgres reports a lost transactional race as SQLSTATE 40001
    /// (serialization_failure) or 40P01 (deadlock_detected); a violated
    /// uniqueness constraint is 23505. Everything else stays a plain
    /// database error.
    pub fn from_store(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") => {
                    return AppError::Conflict(
                        "Concurrent update lost the race, retry the request".to_string(),
                    );
                }
                Some("23505") => {
                    return AppError::NotUnique(db_err.message().to_string());
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }

    /// Re-route an error that was wrapped into [`AppError::Database`] by the
    /// `#[from]` conversion through [`AppError::from_store`]. Lets a
    /// repository map every statement in a transaction, not just the commit.
    pub fn remap_store(self) -> Self {
        match self {
            AppError::Database(err) => AppError::from_store(err),
            other => other,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "Validation", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database",
                    "Database error".to_string(),
                )
            }
            AppError::NotUnique(msg) => (StatusCode::CONFLICT, "NotUnique", msg.clone()),
            AppError::CantBeDeleted(msg) => (StatusCode::CONFLICT, "CantBeDeleted", msg.clone()),
            AppError::CantBeBorrowed(msg) => {
                (StatusCode::CONFLICT, "BookCantBeBorrowed", msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            status: status.as_u16(),
            error: error.to_string(),
            message,
            timestamp: Utc::now(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
