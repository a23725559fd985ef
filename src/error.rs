use sqlx::Error as SqlxError;
use std::sync::Arc;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TallyError {
    #[error("Invalid database path: {0:?}")]
    InvalidPath(String),

    #[error("Database initialization failed: {0}")]
    Init(Arc<SqlxError>),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Config error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl TallyError {
    /// The underlying storage error, if this failure came from SQLite.
    pub fn as_sqlx(&self) -> Option<&SqlxError> {
        match self {
            TallyError::Init(e) => Some(e.as_ref()),
            TallyError::DatabaseError(e) => Some(e),
            TallyError::InvalidPath(_) | TallyError::Config(_) => None,
        }
    }
}
