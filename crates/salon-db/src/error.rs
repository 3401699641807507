//! # Store Errors
//!
//! `DbError` is what the adapters raise internally; every port converts it
//! to `CoreError` on the way out, so use cases never see sqlx.
//!
//! ```text
//! sqlx::Error ──► DbError ──► CoreError ──► Envelope { code, message }
//! ```

use salon_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A status guard inside a transaction touched no row: someone else
    /// settled, received, paid or closed it first.
    #[error("{0}")]
    Conflict(String),

    /// A domain rule evaluated inside the transaction failed (wallet balance).
    #[error("{0}")]
    Rule(String),

    /// `field` is `table.column` as SQLite reports it.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A column CHECK rejected the row. The planners validate first, so
    /// this means a plan slipped past validation.
    #[error("Check constraint failed: {0}")]
    CheckViolation(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        DbError::Conflict(reason.into())
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

/// `"UNIQUE constraint failed: cash_registers.status"` → `cash_registers.status`
fn constraint_target(message: &str) -> String {
    message
        .split_once("constraint failed: ")
        .map(|(_, target)| target.to_string())
        .unwrap_or_else(|| message.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: constraint_target(&message),
                        value: "unknown".to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    ErrorKind::CheckViolation => {
                        DbError::CheckViolation(constraint_target(&message))
                    }
                    _ => DbError::Internal(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// ```text
/// NotFound                    → NotFound
/// Conflict, UniqueViolation   → StateConflict
/// Rule                        → BusinessRule
/// anything else               → Storage
/// ```
impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            DbError::Conflict(reason) => CoreError::StateConflict(reason),
            dup @ DbError::UniqueViolation { .. } => CoreError::StateConflict(dup.to_string()),
            DbError::Rule(reason) => CoreError::BusinessRule(reason),
            other => CoreError::Storage(other.to_string()),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
