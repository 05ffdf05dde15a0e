//! Application users and their storage contract.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;

/// An application user.
///
/// The username is the email address. Roles are stored by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    pub username: String,

    pub email: String,

    /// Argon2 PHC hash. Never serialized into responses.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub email_confirmed: bool,

    /// Inactive users cannot sign in.
    pub active: bool,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Creates a new user builder keyed by email.
    #[must_use]
    pub fn builder(email: impl Into<String>) -> UserBuilder {
        UserBuilder::new(email)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns `true` if the user has a specific role (case-insensitive).
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Starts from an active, confirmed account with no roles.
#[derive(Debug)]
pub struct UserBuilder {
    user: User,
}

impl UserBuilder {
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        let now = OffsetDateTime::now_utc();
        Self {
            user: User {
                id: Uuid::new_v4(),
                username: email.clone(),
                email,
                password_hash: String::new(),
                email_confirmed: true,
                active: true,
                roles: Vec::new(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[must_use]
    pub fn password_hash(mut self, hash: impl Into<String>) -> Self {
        self.user.password_hash = hash.into();
        self
    }

    #[must_use]
    pub fn add_role(mut self, role: impl Into<String>) -> Self {
        self.user.roles.push(role.into());
        self
    }

    #[must_use]
    pub fn build(self) -> User {
        self.user
    }
}

/// Storage operations for users.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Find a user by email, ignoring ASCII case.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// All users, oldest first.
    async fn list(&self) -> AuthResult<Vec<User>>;

    /// Create a user together with its role assignments.
    ///
    /// Either the user and all of its roles are stored, or nothing is.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateEmail` if the email is taken and
    /// `AuthError::RoleNotFound` if a role is unknown to the store.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Number of stored users.
    async fn count(&self) -> AuthResult<usize> {
        Ok(self.list().await?.len())
    }
}

/// Shared user storage.
pub type DynUserStorage = Arc<dyn UserStorage>;
