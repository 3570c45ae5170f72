//! Error taxonomy of the user service and its HTTP mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use std::fmt;
use thiserror::Error;
use tracing::error;

use crate::models::UserId;
use crate::validation::FieldViolation;

/// Unique field a write collided on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Username,
    Email,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictField::Username => f.write_str("username"),
            ConflictField::Email => f.write_str("email"),
        }
    }
}

fn conflict_message(field: &Option<ConflictField>) -> &'static str {
    match field {
        Some(ConflictField::Username) => "Username already exists.",
        Some(ConflictField::Email) => "Email is already registered.",
        None => "A unique field constraint was violated.",
    }
}

fn first_violation(violations: &[FieldViolation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "Invalid input".to_string())
}

/// Custom error type for user operations
#[derive(Error, Debug)]
pub enum UserError {
    /// Malformed input, raised before any store access
    #[error("{}", first_violation(.0))]
    Validation(Vec<FieldViolation>),

    /// Username or email already used by another user
    #[error("{}", conflict_message(.0))]
    Conflict(Option<ConflictField>),

    #[error("User with ID: {0} not found")]
    NotFound(UserId),

    #[error("User not found: {0}")]
    NotFoundBy(String),

    #[error("Role Not Found: {0}")]
    RoleNotFound(String),

    /// Not-null constraint rejected the write
    #[error("A required field is missing and cannot be null: {0}")]
    MissingField(String),

    /// Unclassified storage failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UserError {
    /// HTTP status the error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            UserError::Validation(_) => StatusCode::BAD_REQUEST,
            UserError::Conflict(_) => StatusCode::CONFLICT,
            UserError::NotFound(_) | UserError::NotFoundBy(_) => StatusCode::NOT_FOUND,
            UserError::RoleNotFound(_) | UserError::MissingField(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            UserError::InvalidCredentials | UserError::Unauthorized => StatusCode::UNAUTHORIZED,
            UserError::Forbidden => StatusCode::FORBIDDEN,
            UserError::Persistence(_) | UserError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            UserError::Persistence(e) => {
                error!(error = %e, "Persistence failure");
                "A persistence error occurred".to_string()
            }
            UserError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for user service results
pub type UserResult<T> = Result<T, UserError>;
