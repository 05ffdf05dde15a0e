//! Startup wiring: store selection, migrations and identity seeding.

use std::sync::Arc;

use studentdesk_auth::{
    ADMIN_ROLE, CreateUserRequest, DynRoleStorage, DynUserStorage, IdentityService,
    InMemoryRoleStorage, InMemoryUserStorage, SEEDED_ROLES,
};
use studentdesk_auth_postgres::{PostgresRoleStorage, PostgresUserStorage};
use studentdesk_db_memory::InMemoryStudentRepository;
use studentdesk_db_postgres::{PgPool, PostgresStudentRepository, create_pool, migrations};
use studentdesk_storage::DynStudentRepository;
use tracing::{error, info};

use crate::config::{AppConfig, BootstrapConfig, StorageBackend};

/// The stores the application state is built from.
#[derive(Clone)]
pub struct Backends {
    pub students: DynStudentRepository,
    pub users: DynUserStorage,
    pub roles: DynRoleStorage,
}

impl Backends {
    /// Process-local stores.
    pub fn in_memory() -> Self {
        let roles: DynRoleStorage = Arc::new(InMemoryRoleStorage::new());
        Self {
            students: Arc::new(InMemoryStudentRepository::new()),
            users: Arc::new(InMemoryUserStorage::new(roles.clone())),
            roles,
        }
    }

    /// Stores sharing one PostgreSQL pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            students: Arc::new(PostgresStudentRepository::from_pool(pool.clone())),
            users: Arc::new(PostgresUserStorage::new(pool.clone())),
            roles: Arc::new(PostgresRoleStorage::new(pool)),
        }
    }
}

/// Opens the configured backend.
///
/// For PostgreSQL the pool must connect, but a failed migration is only
/// logged: the server starts against whatever schema is present.
pub async fn init_backends(cfg: &AppConfig) -> anyhow::Result<Backends> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Ok(Backends::in_memory())
        }
        StorageBackend::Postgres => {
            let pool = create_pool(&cfg.storage.postgres).await?;
            if cfg.storage.postgres.run_migrations {
                run_migrations(&pool).await;
            }
            Ok(Backends::postgres(pool))
        }
    }
}

async fn run_migrations(pool: &PgPool) {
    match migrations::run(pool).await {
        Ok(()) => info!(count = migrations::count(), "Database migrations applied"),
        Err(e) => error!(error = %e, "Database migration failed, continuing startup"),
    }
}

/// Seeds the `Admin` and `User` roles and the configured admin account.
///
/// Both steps are idempotent.
pub async fn seed_identity(
    identity: &IdentityService,
    bootstrap: &BootstrapConfig,
) -> anyhow::Result<()> {
    let created = identity.ensure_roles(SEEDED_ROLES).await?;
    if created > 0 {
        info!(created, "Seeded roles");
    }

    if let Some(ref admin) = bootstrap.admin_user {
        let request = CreateUserRequest::new(&admin.email, &admin.password, ADMIN_ROLE);
        if identity.ensure_user(&request).await? {
            info!(email = %admin.email, "Bootstrap admin user created");
        }
    }
    Ok(())
}
