//! PostgreSQL storage backend for StudentDesk auth.
//!
//! Provides persistent storage for users, roles and role assignments in the
//! `users`, `roles` and `user_roles` tables created by the embedded
//! migrations of `studentdesk-db-postgres`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use studentdesk_auth_postgres::{PostgresRoleStorage, PostgresUserStorage};
//!
//! let roles = Arc::new(PostgresRoleStorage::new(pool.clone()));
//! let users = Arc::new(PostgresUserStorage::new(pool));
//! ```

pub mod role;
pub mod user;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;
use studentdesk_auth::AuthError;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use role::PostgresRoleStorage;
pub use user::PostgresUserStorage;

/// Reports a driver failure as an auth storage error.
pub(crate) fn db_error(err: sqlx_core::Error) -> AuthError {
    AuthError::storage(err.to_string())
}

/// Like [`db_error`], but a unique violation becomes `conflict()` instead.
pub(crate) fn unless_unique(
    conflict: impl FnOnce() -> AuthError,
) -> impl FnOnce(sqlx_core::Error) -> AuthError {
    move |err| {
        let unique = matches!(&err, sqlx_core::Error::Database(db) if db.is_unique_violation());
        if unique { conflict() } else { db_error(err) }
    }
}
