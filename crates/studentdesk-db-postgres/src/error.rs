//! Errors raised while bringing up the PostgreSQL backend.
//!
//! Query failures inside the repository map straight to [`StorageError`];
//! this type only covers pool setup and schema migration.

use studentdesk_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// The pool could not reach the database.
    #[error("database unreachable: {0}")]
    Connection(#[from] sqlx_core::Error),

    #[error("schema migration failed: {0}")]
    Migration(String),

    /// Rejected by [`PostgresConfig::validate`](crate::PostgresConfig::validate).
    #[error("invalid postgres settings: {message}")]
    Config { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(source) => StorageError::connection_error(source.to_string()),
            other => StorageError::internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PostgresError>;
