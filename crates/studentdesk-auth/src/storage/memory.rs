//! In-process user and role storage.
//!
//! Backs development runs and tests. Each store keeps its records behind a
//! single `RwLock`, so create-if-absent checks are atomic.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::role::{DynRoleStorage, Role, RoleStorage};
use super::user::{User, UserStorage};
use crate::{AuthError, AuthResult};

/// Roles kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryRoleStorage {
    roles: RwLock<Vec<Role>>,
}

impl InMemoryRoleStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStorage for InMemoryRoleStorage {
    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list(&self) -> AuthResult<Vec<Role>> {
        let mut roles = self.roles.read().await.clone();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn create(&self, role: &Role) -> AuthResult<()> {
        let mut roles = self.roles.write().await;
        if roles.iter().any(|r| r.name.eq_ignore_ascii_case(&role.name)) {
            return Err(AuthError::role_exists(&role.name));
        }
        roles.push(role.clone());
        Ok(())
    }
}

/// Users kept in memory, checked against a role store on create.
pub struct InMemoryUserStorage {
    users: RwLock<Vec<User>>,
    roles: DynRoleStorage,
}

impl InMemoryUserStorage {
    pub fn new(roles: DynRoleStorage) -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            roles,
        }
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        // Resolve every role before touching the user list.
        let mut roles = Vec::with_capacity(user.roles.len());
        for name in &user.roles {
            let role = self
                .roles
                .find_by_name(name)
                .await?
                .ok_or_else(|| AuthError::role_not_found(name))?;
            roles.push(role.name);
        }

        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AuthError::duplicate_email(&user.email));
        }

        let mut stored = user.clone();
        stored.roles = roles;
        users.push(stored);
        Ok(())
    }

    async fn count(&self) -> AuthResult<usize> {
        Ok(self.users.read().await.len())
    }
}
