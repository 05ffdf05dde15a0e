//! Roles and their storage contract.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;

/// Full administrative access.
pub const ADMIN_ROLE: &str = "Admin";

/// Regular staff access.
pub const USER_ROLE: &str = "User";

/// Roles created at startup.
pub const SEEDED_ROLES: &[&str] = &[ADMIN_ROLE, USER_ROLE];

/// A named role that can be assigned to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Role {
    /// Seeded roles get a stock description, any other name none.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = match name.as_str() {
            ADMIN_ROLE => Some("Manages users and student records".to_string()),
            USER_ROLE => Some("Maintains student records".to_string()),
            _ => None,
        };
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Storage operations for roles.
#[async_trait]
pub trait RoleStorage: Send + Sync {
    /// Find a role by name, ignoring ASCII case.
    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Role>>;

    /// All roles ordered by name.
    async fn list(&self) -> AuthResult<Vec<Role>>;

    /// Create a role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RoleExists` if the name is taken.
    async fn create(&self, role: &Role) -> AuthResult<()>;

    /// Returns `true` if a role with this name exists.
    async fn exists(&self, name: &str) -> AuthResult<bool> {
        Ok(self.find_by_name(name).await?.is_some())
    }
}

/// Shared role storage.
pub type DynRoleStorage = Arc<dyn RoleStorage>;
