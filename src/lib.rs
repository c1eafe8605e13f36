//! # Workboard - multi-tenant project-management data store
//!
//! Relational data model for organizations, users, projects, tasks,
//! milestones, messages, notifications, daily reports and documents.
//!
//! Workboard provides:
//! - A SQLite schema with cascade / nullify / restrict policies per reference
//! - A typed data-access layer (`Store`) that enforces the cross-table rules
//!   the schema cannot express (organization consistency, access gating)
//! - Lifecycle side effects that must commit atomically, such as removing a
//!   project's team when it reaches `completed`

pub mod config;
pub mod model;
pub mod seed;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use model::{
    DateRange, ProjectRole, ProjectStatus, ProjectVisibilityMode, TaskPriority, TaskStatus, UserRole,
};
pub use storage::Store;

/// Result type alias for Workboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Workboard operations
///
/// Constraint violations reported by SQLite are classified into
/// `ForeignKey`, `Unique` and `Constraint`; everything else the engine
/// reports (including failing to open the database) is `Storage`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    #[error("Uniqueness violation: {0}")]
    Unique(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Organization mismatch: {entity} belongs to organization {found}, expected {expected}")]
    OrganizationMismatch {
        entity: &'static str,
        expected: i64,
        found: i64,
    },

    #[error("Invalid status transition for project {project_id}: {from} -> {to}")]
    InvalidTransition {
        project_id: i64,
        from: ProjectStatus,
        to: ProjectStatus,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        match &err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let detail = message.clone().unwrap_or_else(|| code.to_string());
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Error::ForeignKey(detail),
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        Error::Unique(detail)
                    }
                    _ => Error::Constraint(detail),
                }
            }
            _ => Error::Storage(err),
        }
    }
}

impl Error {
    /// Shorthand for a missing row
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Error::NotFound { entity, id }
    }

    /// True for foreign key, uniqueness and domain (CHECK / NOT NULL) failures
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::ForeignKey(_) | Error::Unique(_) | Error::Constraint(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_unique_violation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: Error = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Unique(_)));
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_classifies_check_violation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT CHECK (v IN ('x', 'y')));")
            .unwrap();
        let err: Error = conn
            .execute("INSERT INTO t VALUES ('z')", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Constraint(_)));
    }

    #[test]
    fn test_non_constraint_errors_stay_storage() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: Error = conn
            .execute("SELECT * FROM missing_table", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!err.is_constraint_violation());
    }
}
