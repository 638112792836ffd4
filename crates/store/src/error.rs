use schema::{EntityKind, ValidationError};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write model failed its field constraints.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No row of this kind has the given id.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// A foreign key does not resolve to an existing row.
    #[error("{child}.{column} references missing {target} {id}")]
    DanglingReference {
        child: EntityKind,
        column: &'static str,
        target: EntityKind,
        id: i64,
    },

    /// A restricted delete was attempted while dependents exist.
    #[error("Cannot delete {kind} {id}: still referenced by {count} {dependent} row(s)")]
    DeleteRestricted {
        kind: EntityKind,
        id: i64,
        dependent: EntityKind,
        count: usize,
    },

    /// A unique constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// True for dangling foreign keys and restricted deletes.
    pub fn is_referential_integrity(&self) -> bool {
        matches!(
            self,
            StoreError::DanglingReference { .. } | StoreError::DeleteRestricted { .. }
        )
    }

    pub fn not_found(kind: EntityKind, id: impl Into<i64>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
