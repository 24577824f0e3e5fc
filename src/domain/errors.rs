//! Domain errors for the DSA Lab provisioning system.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors raised by the record stores and domain models.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("A live project already exists for user {user_id} and exercise {exercise_id}")]
    DuplicateProject { user_id: String, exercise_id: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
