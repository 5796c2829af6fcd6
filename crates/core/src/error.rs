use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached or refused the write.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The operation can never be rolled back (status, kind, or no applied items).
    #[error("Rollback not allowed: {0}")]
    RollbackIneligible(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
