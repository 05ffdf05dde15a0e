//! Storage traits for users and roles.
//!
//! Backends implement these traits; `memory` provides the in-process one,
//! `studentdesk-auth-postgres` the PostgreSQL one.

pub mod memory;
mod role;
mod user;

pub use memory::{InMemoryRoleStorage, InMemoryUserStorage};
pub use role::{ADMIN_ROLE, DynRoleStorage, Role, RoleStorage, SEEDED_ROLES, USER_ROLE};
pub use user::{DynUserStorage, User, UserBuilder, UserStorage};
