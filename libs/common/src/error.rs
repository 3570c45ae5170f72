//! Custom error types for the common library
//!
//! This module defines the database error type shared by the services, and
//! the classification of PostgreSQL constraint violations by SQLSTATE.

use sqlx::Error as SqlxError;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

/// SQLSTATE raised by PostgreSQL for a unique constraint violation
pub const UNIQUE_VIOLATION_SQL_STATE: &str = "23505";

/// SQLSTATE raised by PostgreSQL for a not-null constraint violation
pub const NOT_NULL_VIOLATION_SQL_STATE: &str = "23502";

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// The targeted row does not exist
    #[error("Row not found")]
    NotFound,

    /// A unique constraint rejected the write
    #[error("Unique constraint violated (constraint: {constraint:?}, column: {column:?})")]
    UniqueViolation {
        constraint: Option<String>,
        column: Option<String>,
    },

    /// A not-null constraint rejected the write
    #[error("Not-null constraint violated (column: {column:?})")]
    NotNullViolation { column: Option<String> },
}

impl DatabaseError {
    /// Build a unique violation naming the offending column
    pub fn unique_violation(constraint: &str, column: &str) -> Self {
        DatabaseError::UniqueViolation {
            constraint: Some(constraint.to_string()),
            column: Some(column.to_string()),
        }
    }

    /// Whether this error is a constraint violation rather than an
    /// infrastructure failure
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::UniqueViolation { .. } | DatabaseError::NotNullViolation { .. }
        )
    }
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => DatabaseError::NotFound,
            SqlxError::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned());
                let constraint = db_err.constraint().map(str::to_string);
                let column = db_err
                    .try_downcast_ref::<PgDatabaseError>()
                    .and_then(|pg| pg.column())
                    .map(str::to_string);

                match code.as_deref() {
                    Some(UNIQUE_VIOLATION_SQL_STATE) => {
                        DatabaseError::UniqueViolation { constraint, column }
                    }
                    Some(NOT_NULL_VIOLATION_SQL_STATE) => DatabaseError::NotNullViolation { column },
                    _ => DatabaseError::Query(SqlxError::Database(db_err)),
                }
            }
            SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
                DatabaseError::Connection(err)
            }
            other => DatabaseError::Query(other),
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: DatabaseError = SqlxError::RowNotFound.into();
        assert!(matches!(err, DatabaseError::NotFound));
    }

    #[test]
    fn pool_timeout_maps_to_connection() {
        let err: DatabaseError = SqlxError::PoolTimedOut.into();
        assert!(matches!(err, DatabaseError::Connection(_)));
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn unique_violation_helper_carries_column() {
        let err = DatabaseError::unique_violation("users_email_key", "email");
        assert!(err.is_constraint_violation());
        match err {
            DatabaseError::UniqueViolation { constraint, column } => {
                assert_eq!(constraint.as_deref(), Some("users_email_key"));
                assert_eq!(column.as_deref(), Some("email"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
