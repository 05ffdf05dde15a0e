//! User storage.
//!
//! Users live in `users`; role assignments in `user_roles`. Creating a user
//! writes both inside one transaction.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use studentdesk_auth::{AuthError, AuthResult, User, UserStorage};

use crate::{PgPool, db_error, unless_unique};

type UserRow = (
    Uuid,
    String,
    String,
    String,
    bool,
    bool,
    OffsetDateTime,
    OffsetDateTime,
    Vec<String>,
);

const SELECT_USERS: &str = r#"
    SELECT u.id, u.username, u.email, u.password_hash, u.email_confirmed, u.active,
           u.created_at, u.updated_at,
           COALESCE(ARRAY_AGG(r.name ORDER BY r.name) FILTER (WHERE r.name IS NOT NULL),
                    '{}'::text[]) AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

fn row_to_user(row: UserRow) -> User {
    let (id, username, email, password_hash, email_confirmed, active, created_at, updated_at, roles) =
        row;
    User {
        id,
        username,
        email,
        password_hash,
        email_confirmed,
        active,
        roles,
        created_at,
        updated_at,
    }
}

/// Users in the `users` table.
#[derive(Debug, Clone)]
pub struct PostgresUserStorage {
    pool: PgPool,
}

impl PostgresUserStorage {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStorage for PostgresUserStorage {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let sql = format!("{SELECT_USERS} WHERE LOWER(u.email) = LOWER($1) GROUP BY u.id");
        let row: Option<UserRow> = query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(row_to_user))
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        let sql = format!("{SELECT_USERS} GROUP BY u.id ORDER BY u.created_at, u.email");
        let rows: Vec<UserRow> = query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(row_to_user).collect())
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let mut role_ids = Vec::with_capacity(user.roles.len());
        for name in &user.roles {
            let row: Option<(Uuid,)> =
                query_as("SELECT id FROM roles WHERE LOWER(name) = LOWER($1)")
                    .bind(name)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error)?;
            let (role_id,) = row.ok_or_else(|| AuthError::role_not_found(name))?;
            role_ids.push(role_id);
        }

        query(
            r#"
            INSERT INTO users (id, username, email, password_hash, email_confirmed, active,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.email_confirmed)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(unless_unique(|| AuthError::duplicate_email(&user.email)))?;

        for role_id in role_ids {
            query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(user.id)
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit().await.map_err(db_error)?;

        tracing::debug!(user_id = %user.id, "Inserted user");
        Ok(())
    }
}
