//! # studentdesk-auth
//!
//! Authentication and authorization for StudentDesk.
//!
//! This crate provides:
//! - Users and roles with storage traits and in-memory backends
//! - Argon2 password hashing and a configurable password policy
//! - Server-side sessions referenced by an HTTP-only cookie
//! - Named policies checked by the [`middleware::Authorized`] extractor
//!
//! ## Modules
//!
//! - [`config`] - Cookie and password settings
//! - [`identity`] - User creation, sign-in and seeding
//! - [`middleware`] - Axum extractors
//! - [`password`] - Hashing and password policy
//! - [`policy`] - Named policies and the principal type
//! - [`session`] - Session store
//! - [`storage`] - Storage traits for users and roles

pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod session;
pub mod storage;

pub use config::{AuthConfig, ConfigError, CookieConfig};
pub use error::{AuthError, ErrorCategory};
pub use identity::{CreateUserRequest, IdentityService};
pub use middleware::{AuthState, Authorized, MaybePrincipal, SessionToken, renew_session_cookie};
pub use password::PasswordPolicy;
pub use policy::{Decision, Policy, PolicyMarker, Principal, Requirement, require};
pub use session::{Session, SessionStore};
pub use storage::{
    ADMIN_ROLE, DynRoleStorage, DynUserStorage, InMemoryRoleStorage, InMemoryUserStorage, Role,
    RoleStorage, SEEDED_ROLES, USER_ROLE, User, UserStorage,
};

/// Result type alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
