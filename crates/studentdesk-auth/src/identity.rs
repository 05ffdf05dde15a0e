//! User and role management on top of the storage traits.

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::password::{PasswordPolicy, hash_password, verify_password};
use crate::storage::{DynRoleStorage, DynUserStorage, Role, User};
use crate::{AuthError, AuthResult};

/// Input for creating a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default, alias = "Email")]
    pub email: String,
    #[serde(default, alias = "Password")]
    pub password: String,
    #[serde(default, alias = "Role")]
    pub role: String,
}

impl CreateUserRequest {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            role: role.into(),
        }
    }
}

/// Owns user/role storage and password handling.
#[derive(Clone)]
pub struct IdentityService {
    users: DynUserStorage,
    roles: DynRoleStorage,
    password_policy: PasswordPolicy,
}

impl IdentityService {
    pub fn new(users: DynUserStorage, roles: DynRoleStorage, password_policy: PasswordPolicy) -> Self {
        Self {
            users,
            roles,
            password_policy,
        }
    }

    pub async fn list_users(&self) -> AuthResult<Vec<User>> {
        self.users.list().await
    }

    pub async fn list_roles(&self) -> AuthResult<Vec<Role>> {
        self.roles.list().await
    }

    /// Creates a user and assigns the role.
    ///
    /// Checks run in order: all fields present, role exists, email unused,
    /// password policy. Nothing is stored unless every check passes.
    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn create_user(&self, request: &CreateUserRequest) -> AuthResult<User> {
        let email = request.email.trim();
        let role_name = request.role.trim();

        if email.is_empty() || request.password.is_empty() || role_name.is_empty() {
            return Err(AuthError::validation("All fields are required!"));
        }

        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| AuthError::role_not_found(role_name))?;

        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::duplicate_email(email));
        }

        self.password_policy
            .check(&request.password)
            .map_err(AuthError::validation)?;

        let password_hash = hash_blocking(request.password.clone()).await?;
        let user = User::builder(email)
            .password_hash(password_hash)
            .add_role(role.name)
            .build();

        self.users.create(&user).await?;
        info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    /// Checks an email/password pair.
    ///
    /// Unknown emails, inactive accounts and wrong passwords all yield
    /// `InvalidCredentials`.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        let Some(user) = self.users.find_by_email(email.trim()).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !user.is_active() {
            warn!(user_id = %user.id, "Sign-in attempt for inactive user");
            return Err(AuthError::InvalidCredentials);
        }

        let hash = user.password_hash.clone();
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))??;

        if matches {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Creates any of the named roles that do not exist yet.
    ///
    /// Returns how many roles were created.
    pub async fn ensure_roles(&self, names: &[&str]) -> AuthResult<usize> {
        let mut created = 0;
        for name in names {
            if self.roles.exists(name).await? {
                continue;
            }
            match self.roles.create(&Role::new(*name)).await {
                Ok(()) => {
                    info!(role = %name, "Seeded role");
                    created += 1;
                }
                // Another instance seeded it first.
                Err(AuthError::RoleExists { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }

    /// Creates the user unless one with the same email exists.
    ///
    /// Returns `true` if a user was created.
    pub async fn ensure_user(&self, request: &CreateUserRequest) -> AuthResult<bool> {
        match self.create_user(request).await {
            Ok(_) => Ok(true),
            Err(AuthError::DuplicateEmail { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

async fn hash_blocking(password: String) -> AuthResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::internal(format!("password hashing task failed: {e}")))??;
    Ok(hash)
}
