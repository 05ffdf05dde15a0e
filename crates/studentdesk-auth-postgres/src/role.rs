//! Role storage.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use studentdesk_auth::{AuthError, AuthResult, Role, RoleStorage};

use crate::{PgPool, db_error, unless_unique};

type RoleRow = (Uuid, String, Option<String>, OffsetDateTime);

fn row_to_role((id, name, description, created_at): RoleRow) -> Role {
    Role {
        id,
        name,
        description,
        created_at,
    }
}

/// Roles in the `roles` table.
#[derive(Debug, Clone)]
pub struct PostgresRoleStorage {
    pool: PgPool,
}

impl PostgresRoleStorage {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStorage for PostgresRoleStorage {
    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Role>> {
        let row: Option<RoleRow> = query_as(
            "SELECT id, name, description, created_at FROM roles WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(row_to_role))
    }

    async fn list(&self) -> AuthResult<Vec<Role>> {
        let rows: Vec<RoleRow> =
            query_as("SELECT id, name, description, created_at FROM roles ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(rows.into_iter().map(row_to_role).collect())
    }

    async fn create(&self, role: &Role) -> AuthResult<()> {
        query("INSERT INTO roles (id, name, description, created_at) VALUES ($1, $2, $3, $4)")
            .bind(role.id)
            .bind(&role.name)
            .bind(&role.description)
            .bind(role.created_at)
            .execute(&self.pool)
            .await
            .map_err(unless_unique(|| AuthError::role_exists(&role.name)))?;

        tracing::debug!(role = %role.name, "Inserted role");
        Ok(())
    }
}
