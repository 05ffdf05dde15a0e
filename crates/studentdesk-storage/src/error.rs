//! Errors returned by student repositories.

/// Failure of a repository call.
///
/// Absent records are not errors: lookups return `None` and updates or
/// deletes of unknown ids report that nothing changed.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be reached.
    #[error("storage unavailable: {message}")]
    ConnectionError { message: String },

    /// The backend rejected or failed the operation.
    #[error("storage failure: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` when retrying later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError { .. })
    }
}
