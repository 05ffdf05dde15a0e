//! Authentication and authorization error types.

use std::fmt;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request has no valid session; the client should sign in.
    #[error("Login required to access {return_url}")]
    LoginRequired {
        /// Where the login page lives.
        login_path: String,
        /// The path the client asked for, used to return after sign-in.
        return_url: String,
    },

    /// The signed-in user does not satisfy the policy.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The email/password pair does not match an active account.
    #[error("Invalid login attempt.")]
    InvalidCredentials,

    /// Input failed validation (missing fields, password policy).
    #[error("{message}")]
    Validation {
        /// Message suitable for redisplaying next to the form.
        message: String,
    },

    /// The named role is not known to the role store.
    #[error("Role does not exist!")]
    RoleNotFound {
        /// The requested role name.
        role: String,
    },

    /// A user with the same email already exists.
    #[error("User already exists!")]
    DuplicateEmail {
        /// The conflicting email.
        email: String,
    },

    /// A role with the same name already exists.
    #[error("Role already exists: {name}")]
    RoleExists {
        /// The conflicting role name.
        name: String,
    },

    /// A storage operation failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// An internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `LoginRequired` error.
    #[must_use]
    pub fn login_required(login_path: impl Into<String>, return_url: impl Into<String>) -> Self {
        Self::LoginRequired {
            login_path: login_path.into(),
            return_url: return_url.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `RoleNotFound` error.
    #[must_use]
    pub fn role_not_found(role: impl Into<String>) -> Self {
        Self::RoleNotFound { role: role.into() }
    }

    /// Creates a new `DuplicateEmail` error.
    #[must_use]
    pub fn duplicate_email(email: impl Into<String>) -> Self {
        Self::DuplicateEmail {
            email: email.into(),
        }
    }

    /// Creates a new `RoleExists` error.
    #[must_use]
    pub fn role_exists(name: impl Into<String>) -> Self {
        Self::RoleExists { name: name.into() }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the error was caused by the submitted input rather
    /// than the server, so the form should be shown again.
    #[must_use]
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::RoleNotFound { .. }
                | Self::DuplicateEmail { .. }
                | Self::InvalidCredentials
        )
    }

    /// Returns the error category for logging.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LoginRequired { .. } | Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::Validation { .. } | Self::RoleNotFound { .. } => ErrorCategory::Validation,
            Self::DuplicateEmail { .. } | Self::RoleExists { .. } => ErrorCategory::Conflict,
            Self::Storage { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::internal(format!("Password hashing failed: {err}"))
    }
}

/// Categories of auth errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    Validation,
    Conflict,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
